// src/noyau/format.rs
//
// Lignes de résultat pour l’hôte :
//   titre       "18.40 EUR"
//   description "20.00 USD = 18.40 EUR (1 USD = 0.92 EUR)"
//   montant     "18.40" (presse-papiers)

use num_rational::BigRational;

use super::conversion::{Conversion, QueryResult};
use super::expr::{CurrencyCode, Quantity};
use super::lecture::format_decimal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ligne {
    pub titre: String,
    pub description: String,
    /// vide pour une ligne d’erreur
    pub montant: String,
}

/* ------------------------ Helpers ------------------------ */

fn montant_devise(m: &BigRational, devise: Option<CurrencyCode>, precision: usize) -> String {
    let texte = format_decimal(m, precision);
    match devise {
        Some(d) => format!("{texte} {d}"),
        None => texte,
    }
}

/// Taux : precision + 2 décimales, zéros finaux retirés jusqu’à `precision`.
/// 0.92 @2 -> "0.92" ; 150 @2 -> "150.00" ; 1/3 @2 -> "0.3333"
fn format_taux(t: &BigRational, precision: usize) -> String {
    let mut s = format_decimal(t, precision + 2);
    if let Some(point) = s.find('.') {
        let minimum = point + 1 + precision;
        while s.len() > minimum && s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

fn ligne(source: &Quantity, c: &Conversion, precision: usize) -> Ligne {
    let depart = montant_devise(&source.magnitude, source.devise, precision);

    match &c.resultat {
        Ok(r) => {
            let montant = format_decimal(&r.montant, precision);
            let titre = format!("{montant} {}", c.destination);
            let description = match source.devise {
                Some(s) => format!(
                    "{depart} = {titre} (1 {s} = {} {})",
                    format_taux(&r.taux_unitaire, precision),
                    c.destination
                ),
                None => format!("{depart} = {titre}"),
            };
            Ligne {
                titre,
                description,
                montant,
            }
        }
        Err(e) => Ligne {
            titre: e.to_string(),
            description: format!("{depart} -> {}", c.destination),
            montant: String::new(),
        },
    }
}

impl QueryResult {
    /// Une ligne par destination, dans l’ordre de la requête.
    pub fn lignes(&self, precision: usize) -> Vec<Ligne> {
        self.conversions
            .iter()
            .map(|c| ligne(&self.source, c, precision))
            .collect()
    }
}
