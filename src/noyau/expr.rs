// src/noyau/expr.rs
//
// Valeurs exactes (sans flottants) et arbre d’expression.
// - CurrencyCode : code canonique 3 lettres, majuscules
// - Quantity     : magnitude rationnelle + devise optionnelle
// - Expr         : Literal / BinaryOp / Group
//
// L’arbre appartient à sa racine (Box), aucun partage, aucun cycle :
// il vit le temps d’une requête.

use num_rational::BigRational;
use num_traits::Zero;

use std::fmt;

use super::lecture::format_rat_court;

/* ------------------------ Code devise ------------------------ */

/// Code devise canonique : exactement 3 lettres ASCII, stockées en majuscules.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const USD: CurrencyCode = CurrencyCode(*b"USD");
    pub const EUR: CurrencyCode = CurrencyCode(*b"EUR");
    pub const JPY: CurrencyCode = CurrencyCode(*b"JPY");

    /// "usd" / " Eur " -> Some ; "us" / "u5d" / "euro" -> None
    pub fn parse(s: &str) -> Option<Self> {
        let b = s.trim().as_bytes();
        if b.len() != 3 || !b.iter().all(u8::is_ascii_alphabetic) {
            return None;
        }
        Some(Self([
            b[0].to_ascii_uppercase(),
            b[1].to_ascii_uppercase(),
            b[2].to_ascii_uppercase(),
        ]))
    }

    pub fn as_str(&self) -> &str {
        // toujours de l’ASCII (garanti par parse)
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ------------------------ Opérateurs ------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn symbole(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbole())
    }
}

/* ------------------------ Quantité ------------------------ */

/// Montant “étiqueté” : magnitude exacte + devise (None tant qu’aucune devise n’est vue).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quantity {
    pub magnitude: BigRational,
    pub devise: Option<CurrencyCode>,
}

impl Quantity {
    pub fn new(magnitude: BigRational, devise: Option<CurrencyCode>) -> Self {
        Self { magnitude, devise }
    }

    /// Nombre sans devise.
    pub fn nue(magnitude: BigRational) -> Self {
        Self::new(magnitude, None)
    }

    pub fn en(magnitude: BigRational, devise: CurrencyCode) -> Self {
        Self::new(magnitude, Some(devise))
    }

    pub fn zero() -> Self {
        Self::nue(BigRational::zero())
    }

    /// Applique la devise par défaut si aucune n’a été vue.
    pub fn ou_defaut(self, defaut: CurrencyCode) -> Self {
        Self {
            devise: self.devise.or(Some(defaut)),
            ..self
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.devise {
            Some(d) => write!(f, "{} {d}", format_rat_court(&self.magnitude)),
            None => write!(f, "{}", format_rat_court(&self.magnitude)),
        }
    }
}

/* ------------------------ Arbre ------------------------ */

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Literal(Quantity),

    /// `position` : position (caractères) de l’opérateur dans la requête.
    BinaryOp {
        op: Op,
        gauche: Box<Expr>,
        droite: Box<Expr>,
        position: usize,
    },

    Group(Box<Expr>),
}

impl Expr {
    pub fn binaire(op: Op, gauche: Expr, droite: Expr, position: usize) -> Expr {
        Expr::BinaryOp {
            op,
            gauche: Box::new(gauche),
            droite: Box::new(droite),
            position,
        }
    }

    pub fn groupe(inner: Expr) -> Expr {
        Expr::Group(Box::new(inner))
    }

    /// Au moins un littéral porte une devise ?
    /// Itératif : pas de récursion sur des arbres profonds.
    pub fn contient_devise(&self) -> bool {
        let mut pile: Vec<&Expr> = vec![self];
        while let Some(e) = pile.pop() {
            match e {
                Expr::Literal(q) => {
                    if q.devise.is_some() {
                        return true;
                    }
                }
                Expr::BinaryOp { gauche, droite, .. } => {
                    pile.push(gauche);
                    pile.push(droite);
                }
                Expr::Group(inner) => pile.push(inner),
            }
        }
        false
    }
}

/// Morceau restant à écrire (affichage sans récursion).
enum Morceau<'a> {
    Noeud(&'a Expr),
    Op(Op),
    Fermer,
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pile = vec![Morceau::Noeud(self)];
        while let Some(m) = pile.pop() {
            match m {
                Morceau::Noeud(Expr::Literal(q)) => write!(f, "{q}")?,
                Morceau::Noeud(Expr::BinaryOp {
                    op, gauche, droite, ..
                }) => {
                    pile.push(Morceau::Noeud(&**droite));
                    pile.push(Morceau::Op(*op));
                    pile.push(Morceau::Noeud(&**gauche));
                }
                Morceau::Noeud(Expr::Group(inner)) => {
                    f.write_str("(")?;
                    pile.push(Morceau::Fermer);
                    pile.push(Morceau::Noeud(&**inner));
                }
                Morceau::Op(op) => write!(f, " {op} ")?,
                Morceau::Fermer => f.write_str(")")?,
            }
        }
        Ok(())
    }
}

/* ---- Libération ---- */

// Détache les enfants de `e` (remplacés par une feuille) et les empile.
fn detacher(e: &mut Expr, pile: &mut Vec<Expr>) {
    let feuille = || Expr::Literal(Quantity::zero());
    match e {
        Expr::Literal(_) => {}
        Expr::BinaryOp { gauche, droite, .. } => {
            pile.push(std::mem::replace(&mut **gauche, feuille()));
            pile.push(std::mem::replace(&mut **droite, feuille()));
        }
        Expr::Group(inner) => pile.push(std::mem::replace(&mut **inner, feuille())),
    }
}

/// Libération itérative : une chaîne de 50 000 termes ne descend pas la pile.
impl Drop for Expr {
    fn drop(&mut self) {
        if matches!(self, Expr::Literal(_)) {
            return;
        }
        let mut pile = Vec::new();
        detacher(self, &mut pile);
        while let Some(mut e) = pile.pop() {
            detacher(&mut e, &mut pile);
        }
    }
}
