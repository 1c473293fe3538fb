//! Member demographics.

/// Hashed member identifier as stored in the claims tables.
pub type MemberId = String;

/// A row of the `members` table.
///
/// Demographic fields are kept positionally, aligned with the column names
/// the claims store reports for the table (every column except the member
/// key, in file order).
///
/// # Examples
///
/// ```
/// use cohort_types::Member;
///
/// let member = Member::new("M1", vec!["F".to_string(), "1980".to_string()]);
/// assert_eq!(member.field(1), Some("1980"));
/// assert_eq!(member.field(5), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
    /// Hashed member identifier.
    pub member_id: MemberId,
    /// Demographic field values, positionally aligned to the store's columns.
    pub fields: Vec<String>,
}

impl Member {
    /// Creates a member record.
    pub fn new(member_id: impl Into<MemberId>, fields: Vec<String>) -> Self {
        Self {
            member_id: member_id.into(),
            fields,
        }
    }

    /// Returns the demographic value at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}
