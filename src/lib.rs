//! Requêtes de conversion de devises en texte libre : "10 + 5 USD in EUR".
//!
//! Le cœur (`noyau`) découpe, analyse, évalue et convertit en rationnels
//! exacts. `QueryEngine::run` est le seul appel dont l’hôte a besoin.

pub mod config;
pub mod erreurs;
pub mod journal;
pub mod moteur;
pub mod noyau;
pub mod taux;

pub use config::{Config, SeparatorSet};
pub use erreurs::{ConfigError, QueryError};
pub use moteur::QueryEngine;
pub use noyau::conversion::QueryResult;
pub use noyau::expr::{CurrencyCode, Quantity};
pub use noyau::format::Ligne;
pub use taux::{PublicationTaux, RateSource, RateTable};
