//! Hand-built linked containers used by the playback core.
//!
//! None of these sit on top of std collections. Every node is owned by
//! exactly one container, all link mutation happens inside that
//! container's own methods, and removal severs and drops the node
//! immediately. The containers are not internally synchronized; they are
//! only touched from the playback manager's serialized state.

pub mod circular_list;
pub mod queue;
pub mod stack;

pub use circular_list::CircularList;
pub use queue::Queue;
pub use stack::Stack;
