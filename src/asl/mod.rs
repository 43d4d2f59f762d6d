// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Authenticated skip lists: full server-side lists and partial client-side
//! lists rebuilt from proofs.

mod client;
pub mod node;
mod skip_list;

pub use node::Node;
pub use node::NodeId;
pub use skip_list::AuthSkipList;
pub use skip_list::Gap;
pub use skip_list::tower_height;
