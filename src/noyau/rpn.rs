// src/noyau/rpn.rs
//
// Shunting-yard -> RPN -> Expr, plus liste de destinations.
//
// Grammaire (précédence croissante) :
//   requete := somme ((ToSep)? destinations)?
//   dests   := Currency ((MultiSep)? Currency)*
//   somme   := terme ((+|-) terme)*
//   terme   := facteur ((*|/) facteur)*
//   facteur := Currency? Number Currency? | Currency | ( somme )
//
// Règles:
// - "5 USD" : une devise collée à un nombre l’étiquette (pas une multiplication).
// - "$5"    : devise préfixe ; une devise seule vaut 1 dans cette devise.
// - Moins unaire : si '-' arrive quand on attend une valeur, on injecte 0.
// - Au niveau 0 seulement : le premier ToSep (le plus à gauche) ouvre la liste ;
//   une devise après un opérande complet l’ouvre aussi ("50 eur usd & cad").
// - Dans des parenthèses, aucun séparateur n’est une destination.

use num_rational::BigRational;
use num_traits::One;

use crate::erreurs::{ParseError, TokenizeError};

use super::expr::{CurrencyCode, Expr, Op, Quantity};
use super::jetons::{Jeton, Token};

/// Résultat de l’analyse d’une requête.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requete {
    pub expr: Expr,
    pub destinations: Vec<CurrencyCode>,
    /// false : liste par défaut de la configuration
    pub destinations_explicites: bool,
}

impl Requete {
    /// La requête nomme-t-elle une devise (source ou destination) ?
    pub fn est_explicite(&self) -> bool {
        self.destinations_explicites || self.expr.contient_devise()
    }
}

/// Échec d’analyse : erreur de jetons (remontée telle quelle) ou de syntaxe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErreurAnalyse {
    Jetons(TokenizeError),
    Syntaxe {
        erreur: ParseError,
        /// position (caractères) du jeton fautif, si elle existe
        position: Option<usize>,
    },
}

/* ------------------------ RPN ------------------------ */

#[derive(Clone, Debug)]
enum Rpn {
    Valeur(Quantity),
    Op(Op, usize),
    Groupe,
}

#[derive(Clone, Debug)]
enum Pile {
    Op(Op, usize),
    // moins unaire (0 déjà en sortie) : lie plus fort que * et /
    Unaire(usize),
    // index du jeton '('
    Ouvrante(usize),
}

impl Pile {
    /// None pour '(' : on ne dépile jamais au-delà.
    fn depiler(&self) -> Option<(u8, Rpn)> {
        match self {
            Pile::Op(op, pos) => Some((op.precedence(), Rpn::Op(*op, *pos))),
            Pile::Unaire(pos) => Some((u8::MAX, Rpn::Op(Op::Sub, *pos))),
            Pile::Ouvrante(_) => None,
        }
    }
}

struct Analyseur {
    sortie: Vec<Rpn>,
    ops: Vec<Pile>,
    profondeur: usize,

    attend_valeur: bool,
    // dernier élément = nombre sans devise : "5 USD" l’étiquette
    etiquetable: bool,
    prefixe: Option<CurrencyCode>,
    vu_operande: bool,

    // Some(..) dès que la liste de destinations est ouverte
    destinations: Option<Vec<CurrencyCode>>,
    dest_attendue: bool,

    positions: Vec<usize>,
}

impl Analyseur {
    fn new() -> Self {
        Self {
            sortie: Vec::new(),
            ops: Vec::new(),
            profondeur: 0,
            attend_valeur: true,
            etiquetable: false,
            prefixe: None,
            vu_operande: false,
            destinations: None,
            dest_attendue: false,
            positions: Vec::new(),
        }
    }

    fn pousser_valeur(&mut self, q: Quantity) {
        self.etiquetable = q.devise.is_none();
        self.sortie.push(Rpn::Valeur(q));
        self.attend_valeur = false;
        self.vu_operande = true;
    }

    /// Devise préfixe restée seule : elle vaut 1 dans cette devise.
    fn vider_prefixe(&mut self) {
        if let Some(c) = self.prefixe.take() {
            self.pousser_valeur(Quantity::en(BigRational::one(), c));
        }
    }

    fn traiter(&mut self, k: usize, token: Token, position: usize) -> Result<(), ParseError> {
        if let Some(dests) = self.destinations.as_mut() {
            return match token {
                Token::Currency(c) => {
                    dests.push(c);
                    self.dest_attendue = false;
                    Ok(())
                }
                Token::MultiSeparator if !self.dest_attendue => {
                    self.dest_attendue = true;
                    Ok(())
                }
                Token::MultiSeparator => Err(ParseError::MissingOperand { index: k }),
                _ => Err(ParseError::TrailingTokens { index: k }),
            };
        }

        match token {
            Token::Number(r) => {
                if !self.attend_valeur {
                    return Err(ParseError::TrailingTokens { index: k });
                }
                let devise = self.prefixe.take();
                self.pousser_valeur(Quantity::new(r, devise));
            }

            Token::Currency(c) => {
                if self.attend_valeur {
                    if self.prefixe.is_some() {
                        // "usd eur" : 1 USD, puis eur est traité comme destination
                        self.vider_prefixe();
                        return self.traiter(k, Token::Currency(c), position);
                    }
                    self.prefixe = Some(c);
                } else if self.etiquetable {
                    if let Some(Rpn::Valeur(q)) = self.sortie.last_mut() {
                        q.devise = Some(c);
                    }
                    self.etiquetable = false;
                } else if self.profondeur > 0 {
                    return Err(ParseError::MisplacedDestination { index: k });
                } else {
                    self.destinations = Some(vec![c]);
                    self.dest_attendue = false;
                }
            }

            Token::Operator(op) => {
                // "$ -5" : un signe laisse la devise préfixe en attente de son nombre
                if matches!(op, Op::Mul | Op::Div) {
                    self.vider_prefixe();
                }
                if self.attend_valeur {
                    return match op {
                        // unaire : "-x" => "0 x -", "+x" => "x"
                        Op::Sub => {
                            self.sortie.push(Rpn::Valeur(Quantity::zero()));
                            self.ops.push(Pile::Unaire(position));
                            Ok(())
                        }
                        Op::Add => Ok(()),
                        Op::Mul | Op::Div => Err(ParseError::MissingOperand { index: k }),
                    };
                }

                // tout est associatif à gauche : on dépile à précédence >=
                while let Some((prec, rpn)) = self.ops.last().and_then(Pile::depiler) {
                    if prec < op.precedence() {
                        break;
                    }
                    self.sortie.push(rpn);
                    self.ops.pop();
                }

                self.ops.push(Pile::Op(op, position));
                self.attend_valeur = true;
                self.etiquetable = false;
            }

            Token::GroupOpen => {
                if self.prefixe.is_some() || !self.attend_valeur {
                    return Err(ParseError::TrailingTokens { index: k });
                }
                self.ops.push(Pile::Ouvrante(k));
                self.profondeur += 1;
            }

            Token::GroupClose => {
                self.vider_prefixe();
                if self.profondeur == 0 {
                    return Err(ParseError::UnbalancedGroup { index: k });
                }
                if self.attend_valeur {
                    return Err(ParseError::MissingOperand { index: k });
                }

                // dépile jusqu’à '('
                while let Some(top) = self.ops.pop() {
                    match top.depiler() {
                        Some((_, rpn)) => self.sortie.push(rpn),
                        None => break,
                    }
                }
                self.sortie.push(Rpn::Groupe);
                self.profondeur -= 1;
                self.etiquetable = false;
            }

            Token::ToSeparator => {
                self.vider_prefixe();
                if !self.vu_operande || self.profondeur > 0 {
                    return Err(ParseError::MisplacedDestination { index: k });
                }
                if self.attend_valeur {
                    return Err(ParseError::MissingOperand { index: k });
                }
                self.destinations = Some(Vec::new());
                self.dest_attendue = true;
            }

            Token::MultiSeparator => {
                return Err(ParseError::MisplacedDestination { index: k });
            }
        }

        Ok(())
    }

    fn terminer(mut self, n: usize) -> Result<(Vec<Rpn>, Option<Vec<CurrencyCode>>), ParseError> {
        self.vider_prefixe();

        if self.destinations.is_some() {
            if self.dest_attendue {
                return Err(ParseError::MissingOperand { index: n });
            }
        } else if !self.vu_operande {
            return Err(ParseError::EmptyExpression);
        } else if self.attend_valeur {
            return Err(ParseError::MissingOperand { index: n });
        }

        while let Some(top) = self.ops.pop() {
            match (top.depiler(), top) {
                (Some((_, rpn)), _) => self.sortie.push(rpn),
                (None, Pile::Ouvrante(index)) => return Err(ParseError::UnbalancedGroup { index }),
                (None, _) => {}
            }
        }

        Ok((self.sortie, self.destinations))
    }
}

/// Construit une Expr à partir d’une RPN.
fn from_rpn(rpn: Vec<Rpn>, n: usize) -> Result<Expr, ParseError> {
    let mut st: Vec<Expr> = Vec::new();
    let invalide = ParseError::MissingOperand { index: n };

    for item in rpn {
        match item {
            Rpn::Valeur(q) => st.push(Expr::Literal(q)),
            Rpn::Op(op, pos) => {
                let b = st.pop().ok_or_else(|| invalide.clone())?;
                let a = st.pop().ok_or_else(|| invalide.clone())?;
                st.push(Expr::binaire(op, a, b, pos));
            }
            Rpn::Groupe => {
                let x = st.pop().ok_or_else(|| invalide.clone())?;
                st.push(Expr::groupe(x));
            }
        }
    }

    match (st.pop(), st.is_empty()) {
        (Some(e), true) => Ok(e),
        _ => Err(ParseError::EmptyExpression),
    }
}

/// Consomme la suite de jetons (une seule fois) et construit la requête.
/// Sans liste de destinations, on prend `defauts`.
pub fn parse<I>(jetons: I, defauts: &[CurrencyCode]) -> Result<Requete, ErreurAnalyse>
where
    I: IntoIterator<Item = Result<Jeton, TokenizeError>>,
{
    let mut a = Analyseur::new();

    for (k, jeton) in jetons.into_iter().enumerate() {
        let Jeton { token, position } = jeton.map_err(ErreurAnalyse::Jetons)?;
        a.positions.push(position);
        if let Err(erreur) = a.traiter(k, token, position) {
            return Err(ErreurAnalyse::Syntaxe {
                erreur,
                position: Some(position),
            });
        }
    }

    let n = a.positions.len();
    let positions = a.positions.clone();
    let syntaxe = |erreur: ParseError| ErreurAnalyse::Syntaxe {
        position: erreur.index().and_then(|i| positions.get(i).copied()),
        erreur,
    };

    let (rpn, destinations) = a.terminer(n).map_err(syntaxe)?;
    let expr = from_rpn(rpn, n).map_err(syntaxe)?;

    let (destinations, destinations_explicites) = match destinations {
        Some(d) if !d.is_empty() => (d, true),
        _ => (defauts.to_vec(), false),
    };

    Ok(Requete {
        expr,
        destinations,
        destinations_explicites,
    })
}
