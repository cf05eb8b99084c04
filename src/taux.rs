// src/taux.rs
//
// Instantanés de taux de change.
//
// - RateTable       : taux (exacts) de chaque devise par rapport à UNE devise de base
// - RateSource      : ce que le moteur consomme (fourni par le collaborateur externe)
// - PublicationTaux : source simple à remplacement atomique de l’instantané
//
// Le moteur ne modifie jamais une table : il lit un instantané. Un nouvel
// instantané remplace l’ancien d’un bloc ; les requêtes en cours gardent
// l’ancien (Arc).

use chrono::{DateTime, Utc};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use serde::Deserialize;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use crate::erreurs::ErreurTaux;
use crate::noyau::expr::CurrencyCode;
use crate::noyau::lecture::parse_decimal_signe;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateTable {
    base: CurrencyCode,
    taux: HashMap<CurrencyCode, BigRational>,
    horodatage: DateTime<Utc>,
}

impl RateTable {
    /// Table vide : seule la base (taux 1).
    pub fn new(base: CurrencyCode, horodatage: DateTime<Utc>) -> Self {
        let mut taux = HashMap::new();
        taux.insert(base, BigRational::one());
        Self {
            base,
            taux,
            horodatage,
        }
    }

    /// `taux` = unités de `code` pour 1 unité de la base. Doit être > 0.
    pub fn inserer(&mut self, code: CurrencyCode, taux: BigRational) -> Result<(), ErreurTaux> {
        if !taux.is_positive() {
            return Err(ErreurTaux::TauxInvalide {
                code,
                texte: taux.to_string(),
            });
        }
        if code == self.base && !taux.is_one() {
            return Err(ErreurTaux::TauxInvalide {
                code,
                texte: taux.to_string(),
            });
        }
        self.taux.insert(code, taux);
        Ok(())
    }

    /// Variante chaînable, pratique pour construire une table à la main.
    pub fn avec(mut self, code: CurrencyCode, taux: BigRational) -> Result<Self, ErreurTaux> {
        self.inserer(code, taux)?;
        Ok(self)
    }

    pub fn taux(&self, code: CurrencyCode) -> Option<&BigRational> {
        self.taux.get(&code)
    }

    pub fn contient(&self, code: CurrencyCode) -> bool {
        self.taux.contains_key(&code)
    }

    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    pub fn horodatage(&self) -> DateTime<Utc> {
        self.horodatage
    }

    /// Codes connus, triés.
    pub fn codes(&self) -> Vec<CurrencyCode> {
        let mut v: Vec<CurrencyCode> = self.taux.keys().copied().collect();
        v.sort_unstable();
        v
    }

    /// Nombre de devises cotées, base comprise.
    pub fn nb_devises(&self) -> usize {
        self.taux.len()
    }

    /// Lit un fichier d’instantané :
    ///
    /// ```toml
    /// base = "USD"
    /// horodatage = "2026-10-18T06:00:00Z"
    /// [taux]
    /// EUR = 0.92
    /// GBP = "0.79"
    /// ```
    ///
    /// Les nombres sont relus depuis leur écriture décimale : 0.92 vaut 92/100.
    pub fn depuis_toml(texte: &str) -> Result<Self, ErreurTaux> {
        let f: FichierTaux =
            toml::from_str(texte).map_err(|e| ErreurTaux::Syntaxe(e.message().to_string()))?;

        let base =
            CurrencyCode::parse(&f.base).ok_or_else(|| ErreurTaux::CodeInvalide(f.base.clone()))?;

        let horodatage = match f.horodatage.as_deref() {
            Some(h) => DateTime::parse_from_rfc3339(h)
                .map_err(|_| ErreurTaux::Horodatage(h.to_string()))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };

        let mut table = Self::new(base, horodatage);
        for (cle, valeur) in f.taux {
            let code = CurrencyCode::parse(&cle).ok_or(ErreurTaux::CodeInvalide(cle))?;
            let texte = match valeur {
                toml::Value::Float(x) => x.to_string(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::String(s) => s,
                autre => autre.to_string(),
            };
            let taux = parse_decimal_signe(&texte).unwrap_or_else(BigRational::zero);
            table
                .inserer(code, taux)
                .map_err(|_| ErreurTaux::TauxInvalide { code, texte })?;
        }

        tracing::info!(
            base = %table.base,
            devises = table.nb_devises(),
            horodatage = %table.horodatage,
            "instantané de taux chargé"
        );
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct FichierTaux {
    base: String,
    horodatage: Option<String>,
    #[serde(default)]
    taux: BTreeMap<String, toml::Value>,
}

/* ------------------------ Source de taux ------------------------ */

/// Capacité fournie par le collaborateur externe (rafraîchissement, cache disque…).
pub trait RateSource: Send + Sync {
    /// None tant qu’aucun instantané n’est disponible.
    fn current_snapshot(&self) -> Option<Arc<RateTable>>;
}

impl RateSource for Arc<RateTable> {
    fn current_snapshot(&self) -> Option<Arc<RateTable>> {
        Some(Arc::clone(self))
    }
}

/// Instantané publié d’un bloc : le verrou ne protège que l’échange d’Arc.
#[derive(Debug, Default)]
pub struct PublicationTaux {
    courant: Mutex<Option<Arc<RateTable>>>,
}

impl PublicationTaux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remplace l’instantané courant ; rend l’ancien.
    pub fn publier(&self, table: RateTable) -> Option<Arc<RateTable>> {
        tracing::debug!(base = %table.base, devises = table.nb_devises(), "publication des taux");
        let mut guard = self.courant.lock().unwrap_or_else(PoisonError::into_inner);
        guard.replace(Arc::new(table))
    }
}

impl RateSource for PublicationTaux {
    fn current_snapshot(&self) -> Option<Arc<RateTable>> {
        let guard = self.courant.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }
}
