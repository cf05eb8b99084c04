// src/config.rs
//
// Instantané de configuration (immuable).
//
// Reconstruit en entier à chaque rechargement : jamais de mutation partielle.
// Toutes les erreurs de chargement sont collectées et remontées en une fois,
// au chargement, jamais pendant une requête.

use serde::Deserialize;

use crate::erreurs::{ConfigError, ProblemeConfig};
use crate::noyau::alias::{alias_utilisable, analyser_lignes, AliasTable, LignesAlias};
use crate::noyau::expr::CurrencyCode;
use crate::noyau::jetons::Token;

/// Valeurs par défaut des réglages du greffon.
pub const ENTREE_DEFAUT: &str = "USD";
pub const SORTIES_DEFAUT: &str = "USD EUR JPY";
pub const SEPARATEURS_DEFAUT: &str = "to in :";
pub const SEPARATEURS_DEST_DEFAUT: &str = "and & ,";
pub const ALIAS_DEFAUT: &str = "EUR = euro euros\nusd = dollar dollars $ bucks";
pub const PRECISION_DEFAUT: usize = 2;

/// Garde-fou : précision d’affichage bornée.
const PRECISION_MAX: usize = 12;

/* ------------------------ Séparateurs ------------------------ */

/// Deux ensembles disjoints de mots déclencheurs (minuscules).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeparatorSet {
    vers: Vec<String>,
    multi: Vec<String>,
}

impl SeparatorSet {
    pub fn new<I, J, S, T>(vers: I, multi: J) -> Result<Self, Vec<ProblemeConfig>>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut problemes = Vec::new();
        let vers = normaliser_mots(vers, &mut problemes);
        let multi = normaliser_mots(multi, &mut problemes);

        for mot in &vers {
            if multi.contains(mot) {
                problemes.push(ProblemeConfig::SeparateurAmbigu { mot: mot.clone() });
            }
        }

        if problemes.is_empty() {
            Ok(Self { vers, multi })
        } else {
            Err(problemes)
        }
    }

    /// Mot -> ToSeparator / MultiSeparator (insensible à la casse).
    pub fn classer(&self, mot: &str) -> Option<Token> {
        let m = mot.to_lowercase();
        if self.vers.contains(&m) {
            Some(Token::ToSeparator)
        } else if self.multi.contains(&m) {
            Some(Token::MultiSeparator)
        } else {
            None
        }
    }
}

impl Default for SeparatorSet {
    fn default() -> Self {
        let mots = |s: &str| -> Vec<String> { s.split_whitespace().map(str::to_string).collect() };
        Self {
            vers: mots(SEPARATEURS_DEFAUT),
            multi: mots(SEPARATEURS_DEST_DEFAUT),
        }
    }
}

fn normaliser_mots<I, S>(mots: I, problemes: &mut Vec<ProblemeConfig>) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for mot in mots {
        let m = mot.as_ref().trim().to_lowercase();
        if m.is_empty() {
            continue;
        }
        if !alias_utilisable(&m) {
            problemes.push(ProblemeConfig::SeparateurInvalide { mot: m });
            continue;
        }
        if !out.contains(&m) {
            out.push(m);
        }
    }
    out
}

/* ------------------------ Config ------------------------ */

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    default_input: CurrencyCode,
    default_outputs: Vec<CurrencyCode>,
    separateurs: SeparatorSet,
    aliases: Vec<(CurrencyCode, Vec<String>)>,
    table_alias: AliasTable,
    precision: usize,
}

impl Config {
    /// Valide tout et rend TOUS les problèmes d’un coup.
    pub fn new<S: AsRef<str>>(
        default_input: &str,
        default_outputs: &[S],
        to_separators: &[S],
        multi_separators: &[S],
        aliases: LignesAlias,
    ) -> Result<Self, ConfigError> {
        let mut problemes = Vec::new();

        let entree = CurrencyCode::parse(default_input);
        if entree.is_none() {
            problemes.push(ProblemeConfig::CodeInvalide {
                code: default_input.to_string(),
                contexte: "devise d'entrée".into(),
            });
        }

        let mut sorties = Vec::new();
        for s in default_outputs {
            match CurrencyCode::parse(s.as_ref()) {
                Some(c) => sorties.push(c),
                None => problemes.push(ProblemeConfig::CodeInvalide {
                    code: s.as_ref().to_string(),
                    contexte: "devises de sortie".into(),
                }),
            }
        }
        if default_outputs.is_empty() {
            problemes.push(ProblemeConfig::SortiesVides);
        }

        let separateurs = match SeparatorSet::new(to_separators, multi_separators) {
            Ok(s) => Some(s),
            Err(p) => {
                problemes.extend(p);
                None
            }
        };

        let mut lignes = Vec::new();
        for (code, mots) in aliases {
            let Some(c) = CurrencyCode::parse(&code) else {
                problemes.push(ProblemeConfig::CodeInvalide {
                    code,
                    contexte: "alias".into(),
                });
                continue;
            };
            let mut gardes = Vec::new();
            for mot in mots {
                if alias_utilisable(&mot) {
                    gardes.push(mot);
                } else {
                    problemes.push(ProblemeConfig::AliasInvalide { alias: mot });
                }
            }
            lignes.push((c, gardes));
        }

        match (entree, separateurs) {
            (Some(default_input), Some(separateurs)) if problemes.is_empty() => {
                let table_alias = AliasTable::construire(&lignes);
                signaler_alias_masques(&lignes, &separateurs);
                Ok(Self {
                    default_input,
                    default_outputs: sorties,
                    separateurs,
                    aliases: lignes,
                    table_alias,
                    precision: PRECISION_DEFAUT,
                })
            }
            _ => Err(ConfigError { problemes }),
        }
    }

    /// Lit les réglages TOML du greffon (clés absentes ou vides -> défauts).
    pub fn depuis_toml(texte: &str) -> Result<Self, ConfigError> {
        let reglages: ReglagesBruts = toml::from_str(texte).map_err(|e| ConfigError {
            problemes: vec![ProblemeConfig::Syntaxe(e.message().to_string())],
        })?;
        Self::depuis_reglages(reglages)
    }

    pub fn depuis_reglages(r: ReglagesBruts) -> Result<Self, ConfigError> {
        let entree = non_vide(r.input_cur.as_deref(), ENTREE_DEFAUT);
        let sorties = mots(non_vide(r.output_cur.as_deref(), SORTIES_DEFAUT));
        let vers = mots(non_vide(r.separators.as_deref(), SEPARATEURS_DEFAUT));
        let multi = mots(non_vide(
            r.destination_separators.as_deref(),
            SEPARATEURS_DEST_DEFAUT,
        ));

        // lignes d’alias fautives + autres problèmes : un seul rapport
        let (lignes, mut problemes) =
            analyser_lignes(non_vide(r.aliases.as_deref(), ALIAS_DEFAUT));

        let config = Self::new(entree, &sorties, &vers, &multi, lignes);
        let config = match config {
            Ok(c) if problemes.is_empty() => c,
            Ok(_) => return Err(ConfigError { problemes }),
            Err(e) => {
                problemes.extend(e.problemes);
                return Err(ConfigError { problemes });
            }
        };

        let config = config.avec_precision(r.precision.unwrap_or(PRECISION_DEFAUT));
        tracing::info!(
            entree = %config.default_input,
            sorties = ?config.default_outputs,
            alias = config.table_alias.len(),
            "configuration chargée"
        );
        Ok(config)
    }

    pub fn avec_precision(mut self, precision: usize) -> Self {
        if precision > PRECISION_MAX {
            tracing::warn!(precision, max = PRECISION_MAX, "précision bornée");
        }
        self.precision = precision.min(PRECISION_MAX);
        self
    }

    pub fn default_input(&self) -> CurrencyCode {
        self.default_input
    }

    pub fn default_outputs(&self) -> &[CurrencyCode] {
        &self.default_outputs
    }

    pub fn separateurs(&self) -> &SeparatorSet {
        &self.separateurs
    }

    pub fn table_alias(&self) -> &AliasTable {
        &self.table_alias
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Ce qui diffère entre deux instantanés (pour journaliser un rechargement).
    pub fn changements(&self, nouvelle: &Config) -> Vec<Changement> {
        let mut v = Vec::new();
        if self.default_input != nouvelle.default_input {
            v.push(Changement::Entree {
                avant: self.default_input,
                apres: nouvelle.default_input,
            });
        }
        if self.default_outputs != nouvelle.default_outputs {
            v.push(Changement::Sorties {
                avant: self.default_outputs.clone(),
                apres: nouvelle.default_outputs.clone(),
            });
        }
        if self.separateurs != nouvelle.separateurs {
            v.push(Changement::Separateurs);
        }
        if self.aliases != nouvelle.aliases {
            v.push(Changement::Alias);
        }
        if self.precision != nouvelle.precision {
            v.push(Changement::Precision {
                avant: self.precision,
                apres: nouvelle.precision,
            });
        }
        v
    }
}

impl Default for Config {
    fn default() -> Self {
        let mots = |m: &[&str]| m.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let aliases = vec![
            (CurrencyCode::EUR, mots(&["euro", "euros"])),
            (CurrencyCode::USD, mots(&["dollar", "dollars", "$", "bucks"])),
        ];
        Self {
            default_input: CurrencyCode::USD,
            default_outputs: vec![CurrencyCode::USD, CurrencyCode::EUR, CurrencyCode::JPY],
            separateurs: SeparatorSet::default(),
            table_alias: AliasTable::construire(&aliases),
            aliases,
            precision: PRECISION_DEFAUT,
        }
    }
}

/// Un alias identique à un séparateur ne sera jamais atteint (séparateurs d’abord).
fn signaler_alias_masques(lignes: &[(CurrencyCode, Vec<String>)], sep: &SeparatorSet) {
    for (code, mots) in lignes {
        for mot in mots {
            if sep.classer(mot).is_some() {
                tracing::warn!(alias = %mot, %code, "alias masqué par un séparateur");
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Changement {
    Entree {
        avant: CurrencyCode,
        apres: CurrencyCode,
    },
    Sorties {
        avant: Vec<CurrencyCode>,
        apres: Vec<CurrencyCode>,
    },
    Separateurs,
    Alias,
    Precision {
        avant: usize,
        apres: usize,
    },
}

impl Changement {
    /// Un changement de devises justifie un rafraîchissement des taux.
    pub fn exige_rafraichissement(&self) -> bool {
        matches!(self, Changement::Entree { .. } | Changement::Sorties { .. })
    }
}

/* ------------------------ Réglages bruts (TOML) ------------------------ */

/// Clés du fichier de réglages. Les clés inconnues sont ignorées.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReglagesBruts {
    pub input_cur: Option<String>,
    pub output_cur: Option<String>,
    pub separators: Option<String>,
    pub destination_separators: Option<String>,
    pub aliases: Option<String>,
    pub precision: Option<usize>,
}

fn non_vide<'a>(valeur: Option<&'a str>, defaut: &'a str) -> &'a str {
    match valeur {
        Some(v) if !v.trim().is_empty() => v,
        _ => defaut,
    }
}

fn mots(s: &str) -> Vec<&str> {
    s.split_whitespace().collect()
}
