//! Access policies for Backplane entities.
//!
//! A policy is a small boolean expression over the atoms `public`,
//! `authenticated`, `owner`, and `role:<name>`, combined with `&&` and
//! `||`. Expressions are parsed once — at manifest load — into a
//! [`PolicyExpr`] AST and evaluated many times against a per-request
//! [`AccessContext`], never re-parsed on the hot path.
//!
//! Grammar (no parentheses, `&&` binds tighter than `||`):
//!
//! ```text
//! expr := and ('||' and)*
//! and  := atom ('&&' atom)*
//! atom := 'public' | 'authenticated' | 'owner' | 'role:' name
//! ```
//!
//! Everything here fails closed: an unknown atom is a parse error, and
//! wherever a raw string must be evaluated without a prior successful
//! parse, the result is a denial, never a panic.

mod expr;
mod rbac;
mod set;

pub use expr::{AccessContext, PolicyExpr, PolicyParseError};
pub use rbac::{RbacPolicy, RbacRule, RbacValidator};
pub use set::{ActionPolicy, EntityAction, PolicySet};
