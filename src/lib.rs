// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Verisync - verifiable pathname index for untrusted blob storage.
//!
//! The server keeps an authenticated skip list over every pathname and its
//! content hash. For each operation it sends a compact proof; the client
//! rebuilds just enough of the list to recompute the root label (the basis)
//! and compare it with the one it trusts.
//!
//! # Quick Start
//!
//! ```
//! use verisync::asl::AuthSkipList;
//! use verisync::config::Config;
//! use verisync::integrity::IntegrityManager;
//! use verisync::key::Key;
//! use verisync::proof::Operation;
//! use verisync::prover;
//!
//! // Server side: the full list.
//! let mut server = AuthSkipList::new();
//! server.insert(&Key::path("notes.txt"), vec![1; 32]).unwrap();
//! let basis = server.basis(false).unwrap();
//!
//! // Client side: only the trusted basis.
//! let mut client = IntegrityManager::with_basis(Config::default(), basis);
//! let proof = prover::prove(&mut server, Operation::Upload, "todo.txt").unwrap();
//! client.add_operation(Operation::Upload, "todo.txt", proof, Some(vec![2; 32])).unwrap();
//!
//! server.insert(&Key::path("todo.txt"), vec![2; 32]).unwrap();
//! let committed = server.basis(false).unwrap();
//! client.check_commit_result(&committed).unwrap();
//! assert!(client.is_current(&committed));
//! ```

pub mod asl;
pub mod config;
pub mod error;
pub mod integrity;
pub mod key;
pub mod proof;
pub mod proof_manager;
pub mod prover;
