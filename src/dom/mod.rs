pub mod tree;
pub mod xpath;

pub use tree::{ParseTree, TreeNode, TREE_STRATEGIES};
pub use xpath::PathExpr;
