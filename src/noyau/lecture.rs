// src/noyau/lecture.rs
//
// Passage texte décimal <-> rationnel exact.
// - lecture  : "10", "10.5", ".5", "5." -> BigRational (aucun flottant)
// - écriture : arrondi au plus proche (moitié loin de zéro) sur `digits` décimales

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed};

/* ------------------------ Lecture ------------------------ */

fn pow10(n: usize) -> BigInt {
    BigInt::from(10).pow(n as u32)
}

/// Lit un décimal non signé. Un seul point autorisé, au moins un chiffre.
pub fn parse_decimal(texte: &str) -> Option<BigRational> {
    let (int_str, frac_str) = match texte.split_once('.') {
        Some((i, f)) => (i, f),
        None => (texte, ""),
    };

    if int_str.is_empty() && frac_str.is_empty() {
        return None;
    }
    let tous_chiffres = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !tous_chiffres(int_str) || !tous_chiffres(frac_str) {
        return None;
    }

    let chiffres = format!("{int_str}{frac_str}");
    let n = BigInt::parse_bytes(chiffres.as_bytes(), 10)?;
    Some(BigRational::new(n, pow10(frac_str.len())))
}

/// Lit un décimal éventuellement signé ("-0.5", "+2").
pub fn parse_decimal_signe(texte: &str) -> Option<BigRational> {
    let t = texte.trim();
    if let Some(reste) = t.strip_prefix('-') {
        return parse_decimal(reste).map(|r| -r);
    }
    parse_decimal(t.strip_prefix('+').unwrap_or(t))
}

/* ------------------------ Écriture ------------------------ */

/// Convertit un entier “scalé” (×10^digits) en texte décimal.
pub fn scaled_to_decimal(mut scaled: BigInt, digits: usize) -> String {
    let neg = scaled.is_negative();
    if neg {
        scaled = -scaled;
    }

    let scale = pow10(digits);
    let int_part = &scaled / &scale;
    let frac_part = &scaled % &scale;

    let signe = if neg { "-" } else { "" };

    if digits == 0 {
        return format!("{signe}{int_part}");
    }

    let mut frac = frac_part.to_str_radix(10);
    while frac.len() < digits {
        frac.insert(0, '0');
    }

    format!("{signe}{int_part}.{frac}")
}

/// r -> entier scalé = round(r * 10^digits), moitié loin de zéro.
fn rational_scaled_arrondi(r: &BigRational, digits: usize) -> BigInt {
    let num = r.numer() * pow10(digits);
    let den = r.denom(); // toujours > 0 (Ratio normalisé)

    let deux = BigInt::from(2);
    let q = (num.abs() * &deux + den) / (den * &deux);

    if num.is_negative() {
        -q
    } else {
        q
    }
}

/// Affichage décimal arrondi : 2/3 @2 -> "0.67" ; -1/8 @2 -> "-0.13"
pub fn format_decimal(r: &BigRational, digits: usize) -> String {
    scaled_to_decimal(rational_scaled_arrondi(r, digits), digits)
}

/// Affichage court (debug / arbre) : "5", "21/2".
pub fn format_rat_court(r: &BigRational) -> String {
    let n = r.numer();
    let d = r.denom();
    if d.is_one() {
        format!("{n}")
    } else {
        format!("{n}/{d}")
    }
}
