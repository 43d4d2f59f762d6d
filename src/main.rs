// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

use tracing::info;
use tracing_subscriber::EnvFilter;
use verisync::asl::AuthSkipList;
use verisync::config::Config;
use verisync::integrity::IntegrityManager;
use verisync::key::Key;
use verisync::key::hash;
use verisync::proof::Operation;
use verisync::prover;

/// Upload every argument as a pathname, verifying each commit as a client
/// would, and print the final basis.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::default();
    let mut server = AuthSkipList::with_config(&config);
    let mut client = match IntegrityManager::empty_basis(&config) {
        Ok(basis) => IntegrityManager::with_basis(config, basis),
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    };

    for pathname in std::env::args().skip(1) {
        let filehash = hash(&[pathname.as_bytes()]).0;
        let result = prover::prove(&mut server, Operation::Upload, &pathname)
            .map_err(|err| err.to_string())
            .and_then(|proof| {
                return client
                    .add_operation(Operation::Upload, &pathname, proof, Some(filehash.clone()))
                    .map_err(|err| err.to_string());
            })
            .and_then(|_| {
                let key = Key::path(&pathname);
                let applied = if server.contains(&key) {
                    server.update(&key, filehash)
                } else {
                    server.insert(&key, filehash)
                };
                return applied
                    .and_then(|_| server.basis(false))
                    .map_err(|err| err.to_string());
            })
            .and_then(|basis| client.check_commit_result(&basis).map_err(|err| err.to_string()));

        if let Err(err) = result {
            eprintln!("error: {}: {}", pathname, err);
            std::process::exit(1);
        }
        info!(%pathname, "committed");
    }

    match client.current_basis() {
        Some(basis) => println!("{}", basis),
        None => println!("no basis"),
    }
}
