//! Propriétés du moteur, vérifiées de bout en bout.
//!
//! Un seul instantané de taux (base USD) pour toute la campagne.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use num_bigint::BigInt;
use num_rational::BigRational;
use rstest::rstest;

use crate::config::Config;
use crate::erreurs::{ConvertError, EvalError, ParseError, QueryError, StageError};
use crate::moteur::QueryEngine;
use crate::taux::{PublicationTaux, RateSource, RateTable};

use super::conversion::{aller_retour, QueryResult};
use super::expr::{CurrencyCode, Op};
use super::jetons::{tokenize, Token};

fn code(s: &str) -> CurrencyCode {
    CurrencyCode::parse(s).unwrap()
}

fn rat(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

fn table() -> RateTable {
    RateTable::new(CurrencyCode::USD, Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap())
        .avec(CurrencyCode::EUR, rat(92, 100))
        .and_then(|t| t.avec(code("GBP"), rat(79, 100)))
        .and_then(|t| t.avec(CurrencyCode::JPY, rat(150, 1)))
        .and_then(|t| t.avec(code("CAD"), rat(136, 100)))
        .and_then(|t| t.avec(code("CHF"), rat(88, 100)))
        .unwrap()
}

fn run_avec(texte: &str, config: &Config) -> Result<QueryResult, QueryError> {
    QueryEngine::new().run(texte, config, &table())
}

fn run(texte: &str) -> Result<QueryResult, QueryError> {
    run_avec(texte, &Config::default())
}

fn ok(texte: &str) -> QueryResult {
    run(texte).unwrap_or_else(|e| panic!("run({texte:?}) erreur: {}", e.message()))
}

fn destinations(r: &QueryResult) -> Vec<CurrencyCode> {
    r.conversions.iter().map(|c| c.destination).collect()
}

/* ------------------------ Arithmétique ------------------------ */

#[rstest]
#[case("10*(2+1)", rat(30, 1))]
#[case("5/2", rat(5, 2))]
#[case("2 + 3 * 4", rat(14, 1))]
#[case("(2 + 3) * 4", rat(20, 1))]
#[case("8 - 3 - 1", rat(4, 1))]
#[case("16 / 4 / 2", rat(2, 1))]
#[case("1.5 × 2", rat(3, 1))]
#[case("-(3 - 5) * 2", rat(4, 1))]
fn precedence_standard(#[case] texte: &str, #[case] attendu: BigRational) {
    let r = ok(texte);
    assert_eq!(r.source.magnitude, attendu, "{texte:?}");
    // sans devise : devise d’entrée par défaut
    assert_eq!(r.source.devise, Some(CurrencyCode::USD));
}

/* ------------------------ Aller-retour ------------------------ */

#[rstest]
#[case("EUR", "GBP")]
#[case("USD", "JPY")]
#[case("CAD", "CHF")]
#[case("JPY", "EUR")]
fn aller_retour_reproduit_le_montant(#[case] a: &str, #[case] b: &str) {
    let taux = table();
    for m in [rat(1, 1), rat(12345, 100), rat(1, 3), rat(-7, 2)] {
        let r = aller_retour(&m, code(a), code(b), &taux).unwrap();
        assert_eq!(r, m, "{a} -> {b} -> {a}");
    }
}

/* ------------------------ Idempotence ------------------------ */

#[rstest]
#[case("10 + 5 USD in EUR")]
#[case("50 eur usd & cad")]
#[case("5 USD * 2 EUR")]
#[case("5 usd in xyz, eur")]
fn idempotence(#[case] texte: &str) {
    let config = Config::default();
    assert_eq!(run_avec(texte, &config), run_avec(texte, &config));
}

/* ------------------------ Alias ------------------------ */

#[test]
fn alias_utilisateur_et_symbole() {
    let config = Config::depuis_toml("aliases = \"EUR = euro euros €\"").unwrap();
    for texte in ["5 euro", "5 €", "5 EUROS", "€5"] {
        let jetons: Vec<Token> = tokenize(texte, config.separateurs(), config.table_alias())
            .map(|j| j.unwrap().token)
            .collect();
        assert!(
            jetons.contains(&Token::Currency(CurrencyCode::EUR)),
            "{texte:?} -> {jetons:?}"
        );
    }
}

#[test]
fn separateur_prioritaire_sur_alias() {
    let config = Config::depuis_toml("aliases = \"GBP = to quid\"").unwrap();
    let r = run_avec("5 to eur", &config).unwrap();
    assert_eq!(destinations(&r), vec![CurrencyCode::EUR]);
    assert_eq!(r.source.devise, Some(CurrencyCode::USD));

    // l’autre alias de la ligne reste utilisable
    let r = run_avec("5 quid to eur", &config).unwrap();
    assert_eq!(r.source.devise, Some(code("GBP")));
}

#[test]
fn alias_dernier_defini_gagne() {
    let config = Config::depuis_toml("aliases = \"\"\"\nEUR = pièces\nGBP = pièces\n\"\"\"").unwrap();
    let r = run_avec("5 pièces", &config).unwrap();
    assert_eq!(r.source.devise, Some(code("GBP")));
}

/* ------------------------ Destinations ------------------------ */

#[rstest]
#[case("50 eur usd & cad", vec!["USD", "CAD"])]
#[case("50 eur in usd and cad", vec!["USD", "CAD"])]
#[case("50 eur to jpy, gbp, usd", vec!["JPY", "GBP", "USD"])]
#[case("50 eur : cad cad", vec!["CAD", "CAD"])]
fn ordre_des_destinations(#[case] texte: &str, #[case] attendu: Vec<&str>) {
    let r = ok(texte);
    let attendu: Vec<CurrencyCode> = attendu.into_iter().map(code).collect();
    assert_eq!(destinations(&r), attendu);
    assert!(r.explicite);
}

/* ------------------------ Addition mixte ------------------------ */

#[test]
fn addition_mixte_convertie_avant_la_somme() {
    let taux = table();
    let r = ok("5 USD + 2 GBP in EUR");

    // chaque terme converti en EUR puis additionné
    let eur = |m: BigRational, de: &str| {
        m * taux.taux(CurrencyCode::EUR).unwrap() / taux.taux(code(de)).unwrap()
    };
    let attendu = eur(rat(5, 1), "USD") + eur(rat(2, 1), "GBP");

    assert_eq!(r.montants(), vec![(CurrencyCode::EUR, &attendu)]);
    assert_eq!(r.lignes(2)[0].titre, "6.93 EUR");
}

/* ------------------------ Erreurs ------------------------ */

#[test]
fn produit_de_montants() {
    let e = run("5 USD * 2 EUR").unwrap_err();
    assert!(matches!(
        e.stage,
        StageError::Eval(EvalError::InvalidCurrencyMath { op: Op::Mul, .. })
    ));
}

#[test]
fn devise_absente_des_taux() {
    let e = run("5 XYZ in USD").unwrap_err();
    assert_eq!(
        e.stage,
        StageError::Convert(ConvertError::UnknownCurrency(code("XYZ")))
    );
}

#[test]
fn parenthese_non_fermee() {
    let e = run("10*(2+1 USD").unwrap_err();
    assert_eq!(
        e.stage,
        StageError::Parse(ParseError::UnbalancedGroup { index: 2 })
    );
    assert_eq!(e.position, Some(3));
}

/* ------------------------ Instantanés partagés ------------------------ */

#[test]
fn requetes_concurrentes_sur_un_instantane() {
    let source = PublicationTaux::new();
    source.publier(table());
    let config = Config::default();
    let moteur = QueryEngine::new();

    let attendu = moteur.run_avec_source("5 usd in eur", &config, &source);

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| moteur.run_avec_source("5 usd in eur", &config, &source)))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), attendu);
        }
    });
}

#[test]
fn publication_ne_touche_pas_les_requetes_en_cours() {
    let source = PublicationTaux::new();
    source.publier(table());
    let en_cours: Arc<RateTable> = source.current_snapshot().unwrap();

    let nouvelle = RateTable::new(CurrencyCode::USD, Utc::now())
        .avec(CurrencyCode::EUR, rat(1, 1))
        .unwrap();
    source.publier(nouvelle);

    let moteur = QueryEngine::new();
    let config = Config::default();
    let ancien = moteur.run("10 usd in eur", &config, &en_cours).unwrap();
    let neuf = moteur.run_avec_source("10 usd in eur", &config, &source).unwrap();

    assert_eq!(ancien.montants(), vec![(CurrencyCode::EUR, &rat(92, 10))]);
    assert_eq!(neuf.montants(), vec![(CurrencyCode::EUR, &rat(10, 1))]);
}
