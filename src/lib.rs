//! # petri-reach: reachability analysis of 1-safe Petri nets
//!
//! **`petri-reach`** answers three questions about a 1-safe Petri net (every place holds at most one token):
//! which markings are reachable, whether a reachable deadlock exists, and which reachable marking is best
//! under a linear objective.
//!
//! ## Engines
//!
//! - **Explicit search** ([`explicit`]): breadth-first search over markings packed into a `u64`.
//!   Exact, simple and the ground truth for everything else, but limited to small nets.
//! - **Symbolic search** ([`symbolic`]): the reachable set as a single BDD, computed as a least fixpoint
//!   of the image operator. The BDD manager ([`bdd`]) is canonical, so the fixpoint test is a handle comparison.
//! - **Cutting-plane search** ([`search`]): a 0-1 program ([`ilp`]) constrained by place invariants
//!   ([`invariants`]) proposes candidates; the reachable-set BDD accepts or rejects them, and every rejected
//!   candidate is excluded by one cut.
//!
//! ## Basic Usage
//!
//! ```rust
//! use petri_reach::net::NetBuilder;
//! use petri_reach::search::{find_deadlock, DeadlockSearch};
//! use petri_reach::{explicit, symbolic};
//!
//! // p1 -> t -> p2, and an idle p3
//! let mut builder = NetBuilder::new();
//! let p1 = builder.add_place("p1", true);
//! let p2 = builder.add_place("p2", false);
//! builder.add_place("p3", false);
//! builder.add_transition("t", [p1], [p2]);
//! let net = builder.build();
//!
//! let states = explicit::explore(&net).unwrap();
//! assert_eq!(states.len(), 2);
//!
//! let reachable = symbolic::build(&net);
//! assert_eq!(reachable.count_u64(), Some(2));
//!
//! let deadlock = find_deadlock(&net, &reachable);
//! let DeadlockSearch::Found { marking, .. } = deadlock else { unreachable!() };
//! assert_eq!(net.marked_names(&marking).collect::<Vec<_>>(), vec!["p2"]);
//! ```
//!
//! For a complete run with cross-validation between the engines, see [`analysis::Analyzer`].

pub mod analysis;
pub mod bdd;
pub mod cache;
pub mod config;
pub mod error;
pub mod explicit;
pub mod generators;
pub mod ilp;
pub mod invariants;
pub mod marking;
pub mod net;
pub mod node;
pub mod reference;
pub mod sat;
pub mod search;
pub mod symbolic;
pub mod table;
pub mod types;
