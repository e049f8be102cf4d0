/// DEBIT = money out, CREDIT = money in. Authoritative over the sign of the
/// raw amount string; the stored amount is signed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    /// ING statements mark outgoing rows "Af" and incoming rows "Bij".
    /// Anything that is not "Af" counts as incoming.
    pub fn from_token(token: &str) -> Direction {
        if token.trim().eq_ignore_ascii_case("af") {
            Direction::Debit
        } else {
            Direction::Credit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "DEBIT",
            Direction::Credit => "CREDIT",
        }
    }
}

/// Intermediate representation from a format parser before normalization.
/// All fields are loose strings; nothing has been validated yet.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub booking_date: String,
    /// Counterparty name / short description column.
    pub name: String,
    /// Free-text notes column; preferred over `name` for the description.
    pub memo: String,
    /// IBAN of the account the statement belongs to, when the row carries one.
    pub account_iban: String,
    pub counterparty_iban: String,
    /// Raw direction token ("Af" / "Bij"); parsers fill in a default when
    /// the source format has no sign column.
    pub direction: String,
    pub amount: String,
}

/// Canonical transaction ready for an idempotent insert.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub document_id: i64,
    pub txn_hash: String,
    pub booking_date: String,
    pub value_date: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub direction: Direction,
    pub counterparty_name: Option<String>,
    pub counterparty_iban: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub docs_new: usize,
    pub tx_seen: usize,
    pub tx_new: usize,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ParseEvent {
    pub id: i64,
    pub document_id: i64,
    pub stage: String,
    pub ok: bool,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CategorySpend {
    pub category: String,
    pub debit_cents: i64,
    pub credit_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_token() {
        assert_eq!(Direction::from_token("Af"), Direction::Debit);
        assert_eq!(Direction::from_token(" af "), Direction::Debit);
        assert_eq!(Direction::from_token("AF"), Direction::Debit);
        assert_eq!(Direction::from_token("Bij"), Direction::Credit);
        assert_eq!(Direction::from_token(""), Direction::Credit);
    }
}
