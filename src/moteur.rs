// src/moteur.rs
//
// Moteur de requêtes : le seul point d’entrée de l’hôte.
//
//   texte -> jetons -> (Expr, destinations) -> Quantity -> conversions
//
// Chaque étage rend sa première erreur ; seule la conversion par destination
// continue après un échec (ligne en erreur, les autres restent).
// Aucune E/S, aucun verrou : config et taux sont des instantanés immuables.

use crate::config::Config;
use crate::erreurs::{ConvertError, QueryError};
use crate::noyau::conversion::{convert, QueryResult};
use crate::noyau::eval::evaluate;
use crate::noyau::jetons::tokenize;
use crate::noyau::rpn::{parse, ErreurAnalyse, Requete};
use crate::taux::{RateSource, RateTable};

#[derive(Clone, Copy, Debug, Default)]
pub struct QueryEngine;

impl QueryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Évalue une requête contre un instantané de taux.
    pub fn run(
        &self,
        texte: &str,
        config: &Config,
        taux: &RateTable,
    ) -> Result<QueryResult, QueryError> {
        let span = tracing::debug_span!("requete", texte);
        let _g = span.enter();

        let requete = analyser(texte, config)?;
        executer(texte, requete, config, taux)
    }

    /// Variante branchée sur une source : la syntaxe est vérifiée avant de
    /// demander les taux, donc une requête invalide le reste même sans taux.
    pub fn run_avec_source(
        &self,
        texte: &str,
        config: &Config,
        source: &dyn RateSource,
    ) -> Result<QueryResult, QueryError> {
        let span = tracing::debug_span!("requete", texte);
        let _g = span.enter();

        let requete = analyser(texte, config)?;
        let Some(taux) = source.current_snapshot() else {
            tracing::debug!("aucun instantané de taux");
            return Err(QueryError::new(texte, None, ConvertError::RatesUnavailable));
        };
        executer(texte, requete, config, &taux)
    }
}

fn analyser(texte: &str, config: &Config) -> Result<Requete, QueryError> {
    let jetons = tokenize(texte, config.separateurs(), config.table_alias());

    let requete = parse(jetons, config.default_outputs()).map_err(|e| match e {
        ErreurAnalyse::Jetons(e) => QueryError::new(texte, Some(e.position()), e),
        ErreurAnalyse::Syntaxe { erreur, position } => QueryError::new(texte, position, erreur),
    })?;

    tracing::debug!(
        expr = %requete.expr,
        destinations = ?requete.destinations,
        "requête analysée"
    );
    Ok(requete)
}

fn executer(
    texte: &str,
    requete: Requete,
    config: &Config,
    taux: &RateTable,
) -> Result<QueryResult, QueryError> {
    let explicite = requete.est_explicite();

    let source = evaluate(&requete.expr, taux)
        .map_err(|e| QueryError::new(texte, e.position(), e))?
        .ou_defaut(config.default_input());
    tracing::debug!(%source, "montant évalué");

    let conversions = convert(&source, &requete.destinations, taux)
        .map_err(|e| QueryError::new(texte, None, e))?;

    let resultat = QueryResult {
        source,
        conversions,
        explicite,
    };
    tracing::debug!(
        lignes = resultat.conversions.len(),
        echecs = resultat.echecs().count(),
        "conversions terminées"
    );
    Ok(resultat)
}
