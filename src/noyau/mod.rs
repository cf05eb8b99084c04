//! Noyau exact des requêtes de devises
//!
//! Organisation interne :
//! - alias.rs      : table d’alias (codes ISO, symboles, mots utilisateur)
//! - jetons.rs     : tokenisation paresseuse
//! - expr.rs       : Quantity + arbre (Literal / BinaryOp / Group)
//! - rpn.rs        : shunting-yard + construction Expr + destinations
//! - eval.rs       : évaluation, table de règles par devise
//! - conversion.rs : conversion vers chaque destination
//! - lecture.rs    : texte décimal <-> rationnel
//! - format.rs     : lignes de résultat

pub mod alias;
pub mod conversion;
pub mod eval;
pub mod expr;
pub mod format;
pub mod jetons;
pub mod lecture;
pub mod rpn;

#[cfg(test)]
mod tests_proprietes;

#[cfg(test)]
mod tests_fuzz_safe;
