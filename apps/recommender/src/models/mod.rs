pub mod posting;
pub mod recommendation;
