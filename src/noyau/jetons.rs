// src/noyau/jetons.rs
//
// Découpage paresseux d’une requête en jetons.
//
// Priorité à chaque position :
// 1) chiffres / point décimal      -> Number
// 2) mot (lettres) ou symbole      -> séparateur (d’abord !) puis alias, sinon erreur
// 3) + - * / (× ÷)                 -> Operator
// 4) ( )                           -> GroupOpen / GroupClose
// Les espaces ne sont que des délimiteurs.
//
// La suite est consommée une seule fois et s’arrête à la première erreur.

use num_rational::BigRational;

use std::fmt;
use std::iter::FusedIterator;

use crate::config::SeparatorSet;
use crate::erreurs::TokenizeError;

use super::alias::AliasTable;
use super::expr::{CurrencyCode, Op};
use super::lecture::{format_rat_court, parse_decimal};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Number(BigRational),
    Currency(CurrencyCode),
    Operator(Op),
    GroupOpen,
    GroupClose,
    ToSeparator,
    MultiSeparator,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(r) => f.write_str(&format_rat_court(r)),
            Token::Currency(c) => write!(f, "{c}"),
            Token::Operator(op) => write!(f, "{op}"),
            Token::GroupOpen => f.write_str("("),
            Token::GroupClose => f.write_str(")"),
            Token::ToSeparator => f.write_str("→"),
            Token::MultiSeparator => f.write_str("&"),
        }
    }
}

/// Jeton + position (en caractères) dans la requête.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Jeton {
    pub token: Token,
    pub position: usize,
}

pub struct Jetons<'a> {
    chars: Vec<char>,
    i: usize,
    fini: bool,
    separateurs: &'a SeparatorSet,
    alias: &'a AliasTable,
}

/// Construit la suite paresseuse (rien n’est lu avant le premier `next`).
pub fn tokenize<'a>(
    texte: &str,
    separateurs: &'a SeparatorSet,
    alias: &'a AliasTable,
) -> Jetons<'a> {
    Jetons {
        chars: texte.chars().collect(),
        i: 0,
        fini: false,
        separateurs,
        alias,
    }
}

fn operateur(c: char) -> Option<Op> {
    match c {
        '+' => Some(Op::Add),
        '-' | '−' => Some(Op::Sub),
        '*' | '×' => Some(Op::Mul),
        '/' | '÷' => Some(Op::Div),
        _ => None,
    }
}

/// Caractère “symbole” : ni espace, ni lettre/chiffre, ni opérateur, ni parenthèse.
pub(crate) fn est_symbole(c: char) -> bool {
    !c.is_whitespace()
        && !c.is_alphanumeric()
        && operateur(c).is_none()
        && c != '('
        && c != ')'
}

impl Jetons<'_> {
    fn mot_connu(&self, mot: &str) -> bool {
        self.separateurs.classer(mot).is_some() || self.alias.resout_alias(mot).is_some()
    }

    /// Prolonge [debut, fin) avec des symboles tant que le mot obtenu est connu
    /// (ex: "C" + "$" -> "C$", "=" + ">" -> "=>"). Garde le plus long connu.
    fn prolonger_symboles(&self, debut: usize, fin: usize) -> usize {
        let mut meilleur = fin;
        let mut j = fin;
        while j < self.chars.len() && est_symbole(self.chars[j]) {
            j += 1;
            let candidat: String = self.chars[debut..j].iter().collect();
            if self.mot_connu(&candidat) {
                meilleur = j;
            }
        }
        meilleur
    }

    /// Séparateurs d’abord : un mot configuré comme séparateur n’est jamais un alias.
    fn classer_mot(&self, mot: String, position: usize) -> Result<Token, TokenizeError> {
        if let Some(t) = self.separateurs.classer(&mot) {
            return Ok(t);
        }
        if let Some(c) = self.alias.resolve(&mot) {
            return Ok(Token::Currency(c));
        }
        Err(TokenizeError::UnknownWord { mot, position })
    }

    fn lire(&mut self) -> Option<Result<Jeton, TokenizeError>> {
        let chars = &self.chars;
        while self.i < chars.len() && chars[self.i].is_whitespace() {
            self.i += 1;
        }
        if self.i >= chars.len() {
            return None;
        }

        let debut = self.i;
        let c = chars[debut];
        let suivant_chiffre = chars.get(debut + 1).is_some_and(|n| n.is_ascii_digit());

        let token = if c == '(' {
            self.i += 1;
            Ok(Token::GroupOpen)
        } else if c == ')' {
            self.i += 1;
            Ok(Token::GroupClose)
        } else if let Some(op) = operateur(c) {
            self.i += 1;
            Ok(Token::Operator(op))
        } else if c.is_ascii_digit() || (c == '.' && suivant_chiffre) {
            // Nombre : suite de chiffres et de points
            let mut j = debut;
            while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                j += 1;
            }
            self.i = j;
            let texte: String = chars[debut..j].iter().collect();
            match parse_decimal(&texte) {
                Some(r) => Ok(Token::Number(r)),
                None => Err(TokenizeError::InvalidNumber {
                    texte,
                    position: debut,
                }),
            }
        } else if c.is_alphabetic() {
            // Mot : lettres, éventuellement suivies de symboles si le tout est connu
            let mut j = debut;
            while j < chars.len() && chars[j].is_alphabetic() {
                j += 1;
            }
            let fin = self.prolonger_symboles(debut, j);
            self.i = fin;
            let mot: String = self.chars[debut..fin].iter().collect();
            self.classer_mot(mot, debut)
        } else if est_symbole(c) {
            // Symbole seul ($, €, &, :…) ou suite de symboles connue (=>)
            let fin = self.prolonger_symboles(debut, debut + 1);
            self.i = fin;
            let mot: String = self.chars[debut..fin].iter().collect();
            self.classer_mot(mot, debut)
        } else {
            // alphanumérique non lettre et non chiffre ASCII (ex: '²', '٣')
            self.i += 1;
            Err(TokenizeError::UnknownWord {
                mot: c.to_string(),
                position: debut,
            })
        };

        Some(token.map(|token| Jeton {
            token,
            position: debut,
        }))
    }
}

impl Iterator for Jetons<'_> {
    type Item = Result<Jeton, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fini {
            return None;
        }
        let r = self.lire();
        if !matches!(r, Some(Ok(_))) {
            self.fini = true;
        }
        r
    }
}

impl FusedIterator for Jetons<'_> {}
