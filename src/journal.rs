// src/journal.rs
//
// Abonné `tracing` du binaire. La bibliothèque n’en installe jamais.
// RUST_LOG, s’il est défini, a priorité sur `verbeux`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filtre(verbeux: bool) -> EnvFilter {
    let defaut = if verbeux {
        "devises_qpur=debug,devises=debug,info"
    } else {
        "devises_qpur=info,devises=info,warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(defaut))
}

pub fn init_journal(verbeux: bool) {
    tracing_subscriber::registry()
        .with(filtre(verbeux))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}
