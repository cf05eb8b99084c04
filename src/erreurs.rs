// src/erreurs.rs
//
// Taxonomie des erreurs, une enum par étage du pipeline:
//   jetons -> analyse -> évaluation -> conversion
// plus les erreurs de chargement (réglages, taux).
//
// Aucune de ces erreurs n'est fatale : le moteur reste utilisable pour la
// requête suivante.

use thiserror::Error;

use crate::noyau::expr::{CurrencyCode, Op};

/* ------------------------ Étage 1 : jetons ------------------------ */

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("mot inconnu « {mot} »")]
    UnknownWord { mot: String, position: usize },

    #[error("nombre invalide « {texte} »")]
    InvalidNumber { texte: String, position: usize },
}

impl TokenizeError {
    /// Position (en caractères) dans le texte de la requête.
    pub fn position(&self) -> usize {
        match self {
            TokenizeError::UnknownWord { position, .. }
            | TokenizeError::InvalidNumber { position, .. } => *position,
        }
    }
}

/* ------------------------ Étage 2 : analyse ------------------------ */

/// `index` = rang du jeton fautif dans la suite de jetons.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("parenthèse non équilibrée (jeton {index})")]
    UnbalancedGroup { index: usize },

    #[error("destination mal placée (jeton {index})")]
    MisplacedDestination { index: usize },

    #[error("jetons en trop après l'expression (jeton {index})")]
    TrailingTokens { index: usize },

    #[error("expression vide")]
    EmptyExpression,

    #[error("opérande manquant (jeton {index})")]
    MissingOperand { index: usize },
}

impl ParseError {
    pub fn index(&self) -> Option<usize> {
        match self {
            ParseError::UnbalancedGroup { index }
            | ParseError::MisplacedDestination { index }
            | ParseError::TrailingTokens { index }
            | ParseError::MissingOperand { index } => Some(*index),
            ParseError::EmptyExpression => None,
        }
    }
}

/* ------------------------ Étage 3 : évaluation ------------------------ */

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("opération {op} impossible entre deux montants ({gauche} {op} {droite})")]
    InvalidCurrencyMath {
        op: Op,
        gauche: CurrencyCode,
        droite: CurrencyCode,
        position: usize,
    },

    #[error("division par zéro")]
    DivisionByZero { position: usize },

    /// Taux manquant pour un `+`/`-` mixte ; `position` est celle de l’opérateur.
    #[error("{erreur}")]
    Conversion {
        erreur: ConvertError,
        position: usize,
    },
}

impl EvalError {
    pub fn position(&self) -> Option<usize> {
        match self {
            EvalError::InvalidCurrencyMath { position, .. }
            | EvalError::DivisionByZero { position }
            | EvalError::Conversion { position, .. } => Some(*position),
        }
    }
}

/* ------------------------ Étage 4 : conversion ------------------------ */

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("devise inconnue : {0}")]
    UnknownCurrency(CurrencyCode),

    #[error("taux de change indisponibles")]
    RatesUnavailable,
}

/* ------------------------ Erreur unifiée (moteur) ------------------------ */

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// Première erreur rencontrée par le moteur, avec la requête d'origine et la
/// position (en caractères) du jeton fautif quand elle existe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage}")]
pub struct QueryError {
    pub query: String,
    pub position: Option<usize>,
    #[source]
    pub stage: StageError,
}

impl QueryError {
    pub fn new(query: &str, position: Option<usize>, stage: impl Into<StageError>) -> Self {
        Self {
            query: query.to_string(),
            position,
            stage: stage.into(),
        }
    }

    /// Message pour l'hôte : l'erreur + l'extrait de requête à partir de la position.
    pub fn message(&self) -> String {
        match self.position {
            Some(p) => {
                let extrait: String = self.query.chars().skip(p).take(12).collect();
                if extrait.trim().is_empty() {
                    self.stage.to_string()
                } else {
                    format!("{} : près de « {} »", self.stage, extrait.trim_end())
                }
            }
            None => self.stage.to_string(),
        }
    }
}

/* ------------------------ Chargement (réglages, taux) ------------------------ */

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProblemeConfig {
    #[error("ligne d'alias {ligne} mal formée : {texte:?}")]
    AliasMalForme { ligne: usize, texte: String },

    #[error("alias {alias:?} inutilisable (doit former un seul mot : lettres puis symboles)")]
    AliasInvalide { alias: String },

    #[error("code devise invalide {code:?} ({contexte})")]
    CodeInvalide { code: String, contexte: String },

    #[error("séparateur {mot:?} inutilisable (doit former un seul mot : lettres puis symboles)")]
    SeparateurInvalide { mot: String },

    #[error("séparateur {mot:?} présent dans les deux listes")]
    SeparateurAmbigu { mot: String },

    #[error("aucune devise de sortie")]
    SortiesVides,

    #[error("réglages illisibles : {0}")]
    Syntaxe(String),
}

/// Tous les problèmes d'un chargement, remontés en une seule fois.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("configuration invalide : {}", joindre(.problemes))]
pub struct ConfigError {
    pub problemes: Vec<ProblemeConfig>,
}

fn joindre(problemes: &[ProblemeConfig]) -> String {
    problemes
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" ; ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErreurTaux {
    #[error("fichier de taux illisible : {0}")]
    Syntaxe(String),

    #[error("code devise invalide dans les taux : {0:?}")]
    CodeInvalide(String),

    #[error("taux invalide pour {code} : {texte:?} (attendu : décimal > 0)")]
    TauxInvalide { code: CurrencyCode, texte: String },

    #[error("horodatage invalide : {0:?}")]
    Horodatage(String),
}
