// src/main.rs
//
// Démo en ligne de commande du moteur de devises.
//
//   devises --taux donnees/taux.toml "10 + 5 USD in EUR"
//   echo "50 eur usd & cad" | devises --taux donnees/taux.toml
//
// Sans requête en argument, chaque ligne de l’entrée standard est une requête
// (comme une saisie au clavier, une requête par frappe).

use clap::Parser;

use std::error::Error;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use devises_qpur::journal::init_journal;
use devises_qpur::{Config, PublicationTaux, QueryEngine, RateSource, RateTable};

#[derive(Parser, Debug)]
#[command(name = "devises")]
#[command(about = "Calcul et conversion de devises en texte libre")]
struct Arguments {
    /// Requête (les mots sont rejoints par des espaces)
    requete: Vec<String>,

    /// Fichier de réglages TOML (input_cur, output_cur, separators, aliases…)
    #[arg(short, long)]
    reglages: Option<PathBuf>,

    /// Instantané de taux TOML (base, horodatage, [taux])
    #[arg(short, long, default_value = "donnees/taux.toml")]
    taux: PathBuf,

    /// Nombre de décimales affichées
    #[arg(short, long)]
    precision: Option<usize>,

    /// Journal détaillé (debug)
    #[arg(short, long)]
    verbeux: bool,
}

fn lire(chemin: &Path) -> Result<String, Box<dyn Error>> {
    std::fs::read_to_string(chemin).map_err(|e| format!("{} : {e}", chemin.display()).into())
}

fn charger_config(args: &Arguments) -> Result<Config, Box<dyn Error>> {
    let config = match &args.reglages {
        Some(chemin) => Config::depuis_toml(&lire(chemin)?)?,
        None => Config::default(),
    };
    Ok(match args.precision {
        Some(p) => config.avec_precision(p),
        None => config,
    })
}

/// Rend false si au moins une requête a échoué.
fn repondre(moteur: &QueryEngine, texte: &str, config: &Config, source: &dyn RateSource) -> bool {
    match moteur.run_avec_source(texte, config, source) {
        Ok(resultat) => {
            for ligne in resultat.lignes(config.precision()) {
                println!("{}", ligne.titre);
                println!("    {}", ligne.description);
            }
            if resultat.echecs().next().is_some() {
                if let Some(table) = source.current_snapshot() {
                    let codes: Vec<String> = table.codes().iter().map(|c| c.to_string()).collect();
                    println!("    devises connues : {}", codes.join(" "));
                }
            }
            true
        }
        Err(e) => {
            tracing::debug!(erreur = ?e, "requête refusée");
            eprintln!("✗ {}", e.message());
            false
        }
    }
}

fn lancer(args: Arguments) -> Result<bool, Box<dyn Error>> {
    let config = charger_config(&args)?;
    let table = RateTable::depuis_toml(&lire(&args.taux)?)?;

    let source = PublicationTaux::new();
    let horodatage = table.horodatage();
    tracing::info!(base = %table.base(), devises = table.nb_devises(), "taux chargés");
    source.publier(table);

    let moteur = QueryEngine::new();
    let mut tout_ok = true;

    if args.requete.is_empty() {
        for ligne in io::stdin().lock().lines() {
            let ligne = ligne?;
            if ligne.trim().is_empty() {
                continue;
            }
            tout_ok &= repondre(&moteur, &ligne, &config, &source);
        }
    } else {
        let texte = args.requete.join(" ");
        tout_ok = repondre(&moteur, &texte, &config, &source);
    }

    println!("(taux du {})", horodatage.format("%Y-%m-%d %H:%M UTC"));
    Ok(tout_ok)
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    init_journal(args.verbeux);
    tracing::debug!(?args, "arguments");

    match lancer(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(erreur = %e, "arrêt");
            eprintln!("✗ {e}");
            ExitCode::FAILURE
        }
    }
}
