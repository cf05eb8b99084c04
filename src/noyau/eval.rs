//! Noyau — évaluation d’un arbre de montants
//!
//! Expr -> Quantity, en rationnels exacts.
//!
//! Les combinaisons (devise, devise, opérateur) passent toutes par `regle` :
//! une seule table, chaque cas énuméré et testé.

use num_rational::BigRational;
use num_traits::Zero;

use crate::erreurs::EvalError;
use crate::taux::RateTable;

use super::conversion::convertir_montant;
use super::expr::{CurrencyCode, Expr, Op, Quantity};

/// Ce qu’on fait de deux opérandes étiquetés (ou non).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regle {
    /// Magnitudes combinées telles quelles ; le résultat porte cette devise.
    Direct(Option<CurrencyCode>),
    /// La droite est d’abord convertie dans la devise de gauche (+ et - seulement).
    ConvertirDroite {
        depuis: CurrencyCode,
        vers: CurrencyCode,
    },
    /// Deux montants multipliés ou divisés entre eux.
    Interdit(CurrencyCode, CurrencyCode),
}

/// Table de combinaison.
///
/// | op    | (∅, ∅) | (A, ∅) / (∅, A) | (A, A)    | (A, B)           |
/// |-------|--------|-----------------|-----------|------------------|
/// | + -   | ∅      | A               | A         | B -> A, puis A   |
/// | * /   | ∅      | A               | interdit  | interdit         |
pub fn regle(op: Op, gauche: Option<CurrencyCode>, droite: Option<CurrencyCode>) -> Regle {
    use Regle::*;

    match (op, gauche, droite) {
        (_, None, None) => Direct(None),
        (_, Some(a), None) | (_, None, Some(a)) => Direct(Some(a)),

        (Op::Add | Op::Sub, Some(a), Some(b)) if a == b => Direct(Some(a)),
        (Op::Add | Op::Sub, Some(a), Some(b)) => ConvertirDroite { depuis: b, vers: a },

        (Op::Mul | Op::Div, Some(a), Some(b)) => Interdit(a, b),
    }
}

fn appliquer(
    op: Op,
    g: &BigRational,
    d: &BigRational,
    position: usize,
) -> Result<BigRational, EvalError> {
    Ok(match op {
        Op::Add => g + d,
        Op::Sub => g - d,
        Op::Mul => g * d,
        Op::Div => {
            if d.is_zero() {
                return Err(EvalError::DivisionByZero { position });
            }
            g / d
        }
    })
}

/// Travail en attente pendant le parcours.
enum Cadre<'a> {
    /// Gauche en cours ; la droite reste à visiter.
    Droite {
        op: Op,
        position: usize,
        droite: &'a Expr,
    },
    /// Gauche évaluée ; on attend la droite pour combiner.
    Combiner {
        op: Op,
        position: usize,
        gauche: Quantity,
    },
}

/// Descend à gauche jusqu’à un littéral en empilant les droites à visiter.
fn descendre<'a>(mut e: &'a Expr, cadres: &mut Vec<Cadre<'a>>) -> Quantity {
    loop {
        match e {
            Expr::Literal(q) => return q.clone(),
            Expr::Group(inner) => e = &**inner,
            Expr::BinaryOp {
                op,
                gauche,
                droite,
                position,
            } => {
                cadres.push(Cadre::Droite {
                    op: *op,
                    position: *position,
                    droite: &**droite,
                });
                e = &**gauche;
            }
        }
    }
}

/// Évalue l’arbre. Les taux ne servent qu’aux additions/soustractions mixtes.
///
/// Parcours postfixe sur une pile explicite : gauche, droite, puis combinaison.
/// La profondeur de l’arbre ne touche pas la pile d’appel.
pub fn evaluate(expr: &Expr, taux: &RateTable) -> Result<Quantity, EvalError> {
    let mut cadres: Vec<Cadre> = Vec::new();
    let mut courant = expr;

    loop {
        let mut valeur = descendre(courant, &mut cadres);

        loop {
            match cadres.pop() {
                None => return Ok(valeur),
                Some(Cadre::Droite {
                    op,
                    position,
                    droite,
                }) => {
                    cadres.push(Cadre::Combiner {
                        op,
                        position,
                        gauche: valeur,
                    });
                    courant = droite;
                    break;
                }
                Some(Cadre::Combiner {
                    op,
                    position,
                    gauche,
                }) => {
                    valeur = combiner(op, gauche, valeur, position, taux)?;
                }
            }
        }
    }
}

fn combiner(
    op: Op,
    g: Quantity,
    d: Quantity,
    position: usize,
    taux: &RateTable,
) -> Result<Quantity, EvalError> {
    match regle(op, g.devise, d.devise) {
        Regle::Direct(devise) => {
            let m = appliquer(op, &g.magnitude, &d.magnitude, position)?;
            Ok(Quantity::new(m, devise))
        }

        Regle::ConvertirDroite { depuis, vers } => {
            let d_converti = convertir_montant(&d.magnitude, depuis, vers, taux)
                .map_err(|erreur| EvalError::Conversion { erreur, position })?;
            tracing::trace!(%depuis, %vers, %op, "opérande droit converti");
            let m = appliquer(op, &g.magnitude, &d_converti, position)?;
            Ok(Quantity::en(m, vers))
        }

        Regle::Interdit(gauche, droite) => Err(EvalError::InvalidCurrencyMath {
            op,
            gauche,
            droite,
            position,
        }),
    }
}
