//! Tests fuzz safe : robustesse + déterminisme + limites contrôlées.
//!
//! But : marteler le moteur de requêtes sans brûler la machine.
//! - RNG déterministe (seed fixe)
//! - profondeur bornée
//! - budget temps global
//! - requêtes bien formées : seules les erreurs de domaine sont acceptées
//!   (devise absente des taux, produit de deux montants, division par zéro)
//! - texte arbitraire : jamais de panique, position d’erreur dans le texte

use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use num_bigint::BigInt;
use num_rational::BigRational;

use crate::config::Config;
use crate::erreurs::{ConvertError, EvalError, QueryError, StageError};
use crate::moteur::QueryEngine;
use crate::taux::RateTable;

use super::expr::CurrencyCode;

/* ------------------------ RNG déterministe minimal ------------------------ */

#[derive(Clone)]
struct Rng {
    state: u64,
}
impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }
    fn next_u32(&mut self) -> u32 {
        // LCG simple (déterministe)
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }
    fn pick(&mut self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.next_u32() % n
        }
    }
    fn coin(&mut self) -> bool {
        (self.next_u32() & 1) == 1
    }
    fn choisir<'a>(&mut self, v: &[&'a str]) -> &'a str {
        v[self.pick(v.len() as u32) as usize]
    }
}

/* ------------------------ Budget anti-gel ------------------------ */

fn budget(start: Instant, max: Duration) {
    if start.elapsed() > max {
        panic!("budget temps dépassé: {:?}", max);
    }
}

/* ------------------------ Contexte ------------------------ */

fn rat(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

fn table() -> RateTable {
    let code = |s: &str| CurrencyCode::parse(s).unwrap();
    RateTable::new(CurrencyCode::USD, Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap())
        .avec(CurrencyCode::EUR, rat(92, 100))
        .and_then(|t| t.avec(code("GBP"), rat(79, 100)))
        .and_then(|t| t.avec(CurrencyCode::JPY, rat(150, 1)))
        .and_then(|t| t.avec(code("CAD"), rat(136, 100)))
        .unwrap()
}

/// Erreurs *normales* pour une requête bien formée.
fn is_erreur_attendue(e: &QueryError) -> bool {
    matches!(
        e.stage,
        StageError::Eval(EvalError::DivisionByZero { .. })
            | StageError::Eval(EvalError::InvalidCurrencyMath { .. })
            | StageError::Eval(EvalError::Conversion {
                erreur: ConvertError::UnknownCurrency(_),
                ..
            })
            | StageError::Convert(ConvertError::UnknownCurrency(_))
    )
}

/* ------------------------ Génération de requêtes (bornée) ------------------------ */

const DEVISES: &[&str] = &["usd", "EUR", "gbp", "jpy", "cad", "euros", "bucks", "xyz"];
const PREFIXES: &[&str] = &["$", "€", "£", "¥", "C$"];

fn gen_nombre(rng: &mut Rng) -> String {
    // inclut 0 (utile pour la division par zéro)
    let entier = rng.pick(8);
    if rng.coin() {
        format!("{entier}.{}", rng.pick(100))
    } else {
        format!("{entier}")
    }
}

fn gen_atome(rng: &mut Rng) -> String {
    let n = gen_nombre(rng);
    match rng.pick(5) {
        0 | 1 => n,
        2 | 3 => format!("{n} {}", rng.choisir(DEVISES)),
        _ => format!("{}{n}", rng.choisir(PREFIXES)),
    }
}

fn gen_expr(rng: &mut Rng, depth: usize) -> String {
    if depth == 0 {
        return gen_atome(rng);
    }

    let op = rng.choisir(&["+", "-", "*", "/", "+", "-"]);
    match rng.pick(6) {
        0 => gen_atome(rng),
        1 => format!("-{}", gen_expr(rng, depth - 1)),
        _ => format!(
            "({} {op} {})",
            gen_expr(rng, depth - 1),
            gen_expr(rng, depth - 1)
        ),
    }
}

fn gen_requete(rng: &mut Rng) -> String {
    let expr = gen_expr(rng, 4);
    if !rng.coin() {
        return expr;
    }
    let sep = rng.choisir(&["in", "to", ":"]);
    let n = 1 + rng.pick(3) as usize;
    let dests: Vec<&str> = (0..n).map(|_| rng.choisir(DEVISES)).collect();
    format!("{expr} {sep} {}", dests.join(", "))
}

/* ------------------------ Helper somme balancée anti pile ------------------------ */

fn somme_balancee(terme: &str, n: usize) -> String {
    let mut items: Vec<String> = (0..n).map(|_| terme.to_string()).collect();
    while items.len() > 1 {
        let mut next = Vec::new();
        let mut i = 0;
        while i < items.len() {
            if i + 1 < items.len() {
                next.push(format!("({} + {})", items[i], items[i + 1]));
                i += 2;
            } else {
                next.push(items[i].clone());
                i += 1;
            }
        }
        items = next;
    }
    items.pop().unwrap_or_else(|| "0".to_string())
}

/* ------------------------ Tests ------------------------ */

#[test]
fn fuzz_safe_requetes_bien_formees() {
    let t0 = Instant::now();
    let max = Duration::from_millis(3000);

    let moteur = QueryEngine::new();
    let config = Config::default();
    let taux = table();

    // Même seed => mêmes requêtes => mêmes sorties (déterminisme)
    let mut rng = Rng::new(0xC0FFEE_u64);

    let mut seen_ok = 0usize;
    let mut seen_err = 0usize;

    for _ in 0..150 {
        budget(t0, max);

        let requete = gen_requete(&mut rng);
        let r1 = moteur.run(&requete, &config, &taux);
        let r2 = moteur.run(&requete, &config, &taux);
        assert_eq!(r1, r2, "non déterministe: {requete:?}");

        match r1 {
            Ok(r) => {
                assert!(r.source.devise.is_some(), "devise absente: {requete:?}");
                assert!(!r.conversions.is_empty());
                seen_ok += 1;
            }
            Err(e) => {
                assert!(
                    is_erreur_attendue(&e),
                    "erreur non attendue: requete={requete:?} err={e}"
                );
                seen_err += 1;
            }
        }
    }

    // On veut voir un mix des deux, sinon le fuzz ne “balaye” rien.
    assert!(seen_ok > 10, "trop peu de succès: {seen_ok}");
    assert!(seen_err > 0, "aucune erreur vue: fuzz trop “sage”");
}

#[test]
fn fuzz_safe_texte_arbitraire_sans_panique() {
    let t0 = Instant::now();
    let max = Duration::from_millis(2000);

    let moteur = QueryEngine::new();
    let config = Config::default();
    let taux = table();
    let morceaux = [
        "1", "2.5", ".", "0", "+", "-", "*", "/", "(", ")", " ", "usd", "eur", "in", "to", "&",
        ",", ":", "$", "€", "×", "abc", "x", "é", "C$", "1.2.3",
    ];

    let mut rng = Rng::new(0xBADC0DE_u64);

    for _ in 0..400 {
        budget(t0, max);

        let n = 1 + rng.pick(10);
        let texte: String = (0..n).map(|_| rng.choisir(&morceaux)).collect();

        match moteur.run(&texte, &config, &taux) {
            Ok(r) => assert!(!r.conversions.is_empty()),
            Err(e) => {
                if let Some(p) = e.position {
                    assert!(
                        p <= texte.chars().count(),
                        "position hors texte: {texte:?} {p}"
                    );
                }
                assert!(!e.message().is_empty());
            }
        }
    }
}

#[test]
fn fuzz_safe_somme_balancee_anti_pile() {
    let t0 = Instant::now();
    let max = Duration::from_millis(2000);

    let requete = format!("{} in usd", somme_balancee("0.5 eur", 800));
    let r = QueryEngine::new()
        .run(&requete, &Config::default(), &table())
        .unwrap_or_else(|e| panic!("err: {e}"));
    budget(t0, max);

    // 800 * 0.5 = 400 EUR
    assert_eq!(r.source.magnitude, rat(400, 1));
    assert_eq!(r.source.devise, Some(CurrencyCode::EUR));
    assert_eq!(r.lignes(2)[0].titre, "434.78 USD");
}
