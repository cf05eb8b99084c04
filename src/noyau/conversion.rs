// src/noyau/conversion.rs
//
// Convertisseur : montant * taux[cible] / taux[source], sur un instantané
// de taux partagé (même devise de base pour tout le monde).
//
// - Ordre des destinations conservé, doublons compris.
// - Devise source inconnue : échec global (rien ne peut être converti).
// - Devise cible inconnue : échec de CETTE ligne seulement.

use num_rational::BigRational;

use crate::erreurs::ConvertError;
use crate::taux::RateTable;

use super::expr::{CurrencyCode, Quantity};

/// Une destination convertie (ou son échec).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub destination: CurrencyCode,
    pub resultat: Result<Converti, ConvertError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Converti {
    pub montant: BigRational,
    /// 1 unité source = `taux_unitaire` unités cible
    pub taux_unitaire: BigRational,
}

/// Résultat d’une requête : le montant évalué et une ligne par destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResult {
    pub source: Quantity,
    pub conversions: Vec<Conversion>,
    /// la requête nommait une devise ou une destination
    pub explicite: bool,
}

impl QueryResult {
    /// Paires (devise, montant) des lignes réussies, dans l’ordre.
    pub fn montants(&self) -> Vec<(CurrencyCode, &BigRational)> {
        self.conversions
            .iter()
            .filter_map(|c| c.resultat.as_ref().ok().map(|r| (c.destination, &r.montant)))
            .collect()
    }

    pub fn echecs(&self) -> impl Iterator<Item = &Conversion> {
        self.conversions.iter().filter(|c| c.resultat.is_err())
    }
}

fn taux_de(code: CurrencyCode, taux: &RateTable) -> Result<&BigRational, ConvertError> {
    taux.taux(code).ok_or(ConvertError::UnknownCurrency(code))
}

/// Taux croisé : 1 `depuis` = ? `vers`.
pub fn taux_croise(
    depuis: CurrencyCode,
    vers: CurrencyCode,
    taux: &RateTable,
) -> Result<BigRational, ConvertError> {
    let t_depuis = taux_de(depuis, taux)?;
    let t_vers = taux_de(vers, taux)?;
    Ok(t_vers / t_depuis)
}

/// Conversion d’une magnitude (utilisée aussi par l’évaluateur pour + et -).
pub fn convertir_montant(
    magnitude: &BigRational,
    depuis: CurrencyCode,
    vers: CurrencyCode,
    taux: &RateTable,
) -> Result<BigRational, ConvertError> {
    Ok(magnitude * taux_croise(depuis, vers, taux)?)
}

/// Un montant vers chaque cible, dans l’ordre donné.
/// Un montant sans devise est pris dans la devise de base de la table.
pub fn convert(
    montant: &Quantity,
    cibles: &[CurrencyCode],
    taux: &RateTable,
) -> Result<Vec<Conversion>, ConvertError> {
    let source = montant.devise.unwrap_or_else(|| taux.base());
    if !taux.contient(source) {
        return Err(ConvertError::UnknownCurrency(source));
    }

    let conversions = cibles
        .iter()
        .map(|&destination| {
            let resultat = taux_croise(source, destination, taux).map(|t| Converti {
                montant: &montant.magnitude * &t,
                taux_unitaire: t,
            });
            if let Err(e) = &resultat {
                tracing::debug!(%source, %destination, erreur = %e, "destination ignorée");
            }
            Conversion {
                destination,
                resultat,
            }
        })
        .collect();

    Ok(conversions)
}

/// Aller-retour A -> B -> A : doit redonner le montant (rationnels exacts).
pub fn aller_retour(
    montant: &BigRational,
    a: CurrencyCode,
    b: CurrencyCode,
    taux: &RateTable,
) -> Result<BigRational, ConvertError> {
    let aller = convertir_montant(montant, a, b, taux)?;
    convertir_montant(&aller, b, a, taux)
}
