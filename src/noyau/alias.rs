// src/noyau/alias.rs
//
// Table d’alias : mot visible (code ISO, symbole, mot libre) <-> code canonique.
//
// Ordre de résolution (insensible à la casse) :
//   1) alias utilisateur (lignes “CODE = mot1 mot2 …”, dernière ligne gagnante)
//   2) symboles intégrés ($, €, £, …)
//   3) forme ISO : tout mot de 3 lettres ASCII devient un code (XYZ compris ;
//      l’absence dans la table de taux est signalée à la conversion)
//
// Les séparateurs passent AVANT cette table : voir jetons.rs.

use std::collections::HashMap;

use crate::erreurs::ProblemeConfig;

use super::expr::CurrencyCode;
use super::jetons::est_symbole;

/// Symboles courants, écrasables par l’utilisateur.
const SYMBOLES_INTEGRES: &[(&str, &str)] = &[
    ("$", "USD"),
    ("us$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("₩", "KRW"),
    ("₽", "RUB"),
    ("₺", "TRY"),
    ("₪", "ILS"),
    ("₫", "VND"),
    ("₱", "PHP"),
    ("₴", "UAH"),
    ("₦", "NGN"),
    ("฿", "THB"),
    ("₿", "BTC"),
    ("r$", "BRL"),
    ("c$", "CAD"),
    ("a$", "AUD"),
    ("nz$", "NZD"),
    ("hk$", "HKD"),
    ("zł", "PLN"),
];

/// Lignes d’alias brutes : (code tel qu’écrit, mots).
pub type LignesAlias = Vec<(String, Vec<String>)>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasTable {
    // clé : mot en minuscules
    entrees: HashMap<String, CurrencyCode>,
}

impl AliasTable {
    /// Table avec les seuls symboles intégrés.
    pub fn integree() -> Self {
        let mut t = Self::default();
        for (mot, code) in SYMBOLES_INTEGRES {
            if let Some(c) = CurrencyCode::parse(code) {
                t.inserer(mot, c);
            }
        }
        t
    }

    /// Symboles intégrés puis lignes utilisateur, dans l’ordre (dernière gagnante).
    pub fn construire(lignes: &[(CurrencyCode, Vec<String>)]) -> Self {
        let mut t = Self::integree();
        for (code, mots) in lignes {
            for mot in mots {
                t.inserer(mot, *code);
            }
        }
        t
    }

    fn inserer(&mut self, mot: &str, code: CurrencyCode) {
        let cle = mot.trim().to_lowercase();
        if cle.is_empty() {
            return;
        }
        if let Some(ancien) = self.entrees.insert(cle.clone(), code) {
            if ancien != code {
                tracing::debug!(alias = %cle, %ancien, nouveau = %code, "alias redéfini");
            }
        }
    }

    /// Alias connus uniquement (sans la forme ISO).
    pub fn resout_alias(&self, mot: &str) -> Option<CurrencyCode> {
        self.entrees.get(&mot.to_lowercase()).copied()
    }

    /// Résolution complète : alias, puis alias sans ponctuation autour, puis forme ISO.
    pub fn resolve(&self, mot: &str) -> Option<CurrencyCode> {
        let mot = mot.trim();
        if let Some(c) = self.resout_alias(mot) {
            return Some(c);
        }

        // "(euro," -> "euro" ; "$" reste "$" (sinon il ne resterait rien)
        let nu = mot.trim_matches(|c: char| c.is_ascii_punctuation());
        if nu.is_empty() {
            return None;
        }
        if nu != mot {
            if let Some(c) = self.resout_alias(nu) {
                return Some(c);
            }
        }

        CurrencyCode::parse(nu)
    }

    /// Sens inverse : les mots qui mènent à `code` (triés).
    pub fn mots_pour(&self, code: CurrencyCode) -> Vec<&str> {
        let mut v: Vec<&str> = self
            .entrees
            .iter()
            .filter(|(_, c)| **c == code)
            .map(|(m, _)| m.as_str())
            .collect();
        v.sort_unstable();
        v
    }

    pub fn len(&self) -> usize {
        self.entrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entrees.is_empty()
    }
}

/* ------------------------ Lecture du texte d’alias ------------------------ */

/// Un alias doit être un mot que le découpage en jetons peut produire :
/// des lettres suivies de symboles (`us$`, `zł`), ou des symboles seuls (`€`, `=>`).
/// `€uro` ou `a.b` ne sortiraient jamais d’un seul tenant.
pub fn alias_utilisable(mot: &str) -> bool {
    let symboles = mot.trim_start_matches(char::is_alphabetic);
    !mot.is_empty() && symboles.chars().all(est_symbole)
}

/// Découpe le texte multi-lignes “CODE = mot1 mot2 …”.
/// Lignes vides et commentaires (#) ignorés. Toutes les lignes fautives sont
/// signalées ; les lignes correctes sont gardées quand même.
pub fn analyser_lignes(texte: &str) -> (LignesAlias, Vec<ProblemeConfig>) {
    let mut lignes = Vec::new();
    let mut problemes = Vec::new();

    for (no, brute) in texte.lines().enumerate() {
        let ligne = brute.trim();
        if ligne.is_empty() || ligne.starts_with('#') {
            continue;
        }

        let Some((code, mots)) = ligne.split_once('=') else {
            problemes.push(ProblemeConfig::AliasMalForme {
                ligne: no + 1,
                texte: ligne.to_string(),
            });
            continue;
        };

        let code = code.trim();
        let mots: Vec<String> = mots.split_whitespace().map(str::to_string).collect();
        if code.is_empty() || mots.is_empty() {
            problemes.push(ProblemeConfig::AliasMalForme {
                ligne: no + 1,
                texte: ligne.to_string(),
            });
            continue;
        }

        lignes.push((code.to_string(), mots));
    }

    (lignes, problemes)
}
