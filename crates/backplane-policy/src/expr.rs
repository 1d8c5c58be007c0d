//! Policy expression AST, parser, and evaluator.

use serde::{Deserialize, Serialize};

/// Request-scoped facts a policy is evaluated against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub is_owner: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl AccessContext {
    /// Context with no identity at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn owning(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }
}

/// Errors raised when a policy expression fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyParseError {
    #[error("empty policy expression")]
    Empty,

    #[error("unknown policy atom: {0:?}")]
    UnknownAtom(String),

    #[error("role atom is missing a role name")]
    MissingRoleName,
}

/// Parsed policy expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyExpr {
    /// Always allowed.
    Public,
    /// Allowed when the caller carries a user id.
    Authenticated,
    /// Allowed when the caller owns the target record.
    Owner,
    /// Allowed when the caller's role matches exactly.
    Role(String),
    /// All operands must allow.
    And(Vec<PolicyExpr>),
    /// Any operand may allow.
    Or(Vec<PolicyExpr>),
}

impl PolicyExpr {
    /// Parse an expression string.
    ///
    /// `&&` binds tighter than `||`; there is no grouping syntax.
    pub fn parse(source: &str) -> Result<Self, PolicyParseError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(PolicyParseError::Empty);
        }

        let mut arms = Vec::new();
        for arm in source.split("||") {
            arms.push(Self::parse_and(arm)?);
        }
        Ok(match arms.len() {
            1 => arms.pop().unwrap_or(PolicyExpr::Public),
            _ => PolicyExpr::Or(arms),
        })
    }

    fn parse_and(source: &str) -> Result<Self, PolicyParseError> {
        let mut atoms = Vec::new();
        for atom in source.split("&&") {
            atoms.push(Self::parse_atom(atom)?);
        }
        Ok(match atoms.len() {
            1 => atoms.pop().unwrap_or(PolicyExpr::Public),
            _ => PolicyExpr::And(atoms),
        })
    }

    fn parse_atom(source: &str) -> Result<Self, PolicyParseError> {
        let atom = source.trim();
        match atom {
            "" => Err(PolicyParseError::Empty),
            "public" => Ok(PolicyExpr::Public),
            "authenticated" => Ok(PolicyExpr::Authenticated),
            "owner" => Ok(PolicyExpr::Owner),
            _ => match atom.strip_prefix("role:") {
                Some("") => Err(PolicyParseError::MissingRoleName),
                Some(role) => Ok(PolicyExpr::Role(role.trim().to_string())),
                None => Err(PolicyParseError::UnknownAtom(atom.to_string())),
            },
        }
    }

    /// Evaluate against a context. Pure, never panics.
    pub fn evaluate(&self, ctx: &AccessContext) -> bool {
        match self {
            PolicyExpr::Public => true,
            PolicyExpr::Authenticated => ctx.user_id.is_some(),
            PolicyExpr::Owner => ctx.is_owner,
            PolicyExpr::Role(role) => ctx.role.as_deref() == Some(role.as_str()),
            PolicyExpr::And(operands) => operands.iter().all(|expr| expr.evaluate(ctx)),
            PolicyExpr::Or(operands) => operands.iter().any(|expr| expr.evaluate(ctx)),
        }
    }

    /// Parse-and-evaluate a raw expression string, denying on any
    /// parse failure. This is the fail-closed boundary for policy
    /// strings that reach evaluation without prior compilation.
    pub fn evaluate_str(source: &str, ctx: &AccessContext) -> bool {
        Self::parse(source).map(|expr| expr.evaluate(ctx)).unwrap_or(false)
    }
}

impl std::str::FromStr for PolicyExpr {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
