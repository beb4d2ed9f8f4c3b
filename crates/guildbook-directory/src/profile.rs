//! The self-service attribute whitelist.
//!
//! An update is a closed struct with one optional field per editable
//! attribute, so an attribute outside the whitelist cannot be submitted at
//! all; there is no runtime check to bypass.

/// A set of profile attribute replacements for one record.
///
/// Fields left as `None` are not touched. Replacements are applied in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Common name (`cn`).
    pub cn: Option<String>,
    /// Surname (`sn`).
    pub sn: Option<String>,
    /// Given name (`givenName`).
    pub given_name: Option<String>,
    /// Job title (`title`).
    pub title: Option<String>,
    /// Department (`departmentNumber`).
    pub department: Option<String>,
    /// Free-form description (`description`).
    pub description: Option<String>,
    /// Postal code (`postalCode`).
    pub postal_code: Option<String>,
    /// Postal address (`postalAddress`).
    pub postal_address: Option<String>,
    /// Mobile phone number (`mobile`).
    pub mobile: Option<String>,
    /// Home phone number (`homePhone`).
    pub home_phone: Option<String>,
}

impl ProfileUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the common name.
    #[must_use]
    pub fn with_cn(mut self, cn: impl Into<String>) -> Self {
        self.cn = Some(cn.into());
        self
    }

    /// Sets the surname.
    #[must_use]
    pub fn with_sn(mut self, sn: impl Into<String>) -> Self {
        self.sn = Some(sn.into());
        self
    }

    /// Sets the given name.
    #[must_use]
    pub fn with_given_name(mut self, given_name: impl Into<String>) -> Self {
        self.given_name = Some(given_name.into());
        self
    }

    /// Sets given name and surname and derives `cn` as `"<given> <sn>"`.
    #[must_use]
    pub fn with_full_name(self, given_name: &str, sn: &str) -> Self {
        self.with_cn(format!("{given_name} {sn}"))
            .with_given_name(given_name)
            .with_sn(sn)
    }

    /// Sets the job title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the department.
    #[must_use]
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the postal code.
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    /// Sets the postal address.
    #[must_use]
    pub fn with_postal_address(mut self, postal_address: impl Into<String>) -> Self {
        self.postal_address = Some(postal_address.into());
        self
    }

    /// Sets the mobile phone number.
    #[must_use]
    pub fn with_mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = Some(mobile.into());
        self
    }

    /// Sets the home phone number.
    #[must_use]
    pub fn with_home_phone(mut self, home_phone: impl Into<String>) -> Self {
        self.home_phone = Some(home_phone.into());
        self
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replacements().is_empty()
    }

    /// The attribute replacements this update carries, in declaration order.
    #[must_use]
    pub fn replacements(&self) -> Vec<(&'static str, &str)> {
        let fields = [
            ("cn", &self.cn),
            ("sn", &self.sn),
            ("givenName", &self.given_name),
            ("title", &self.title),
            ("departmentNumber", &self.department),
            ("description", &self.description),
            ("postalCode", &self.postal_code),
            ("postalAddress", &self.postal_address),
            ("mobile", &self.mobile),
            ("homePhone", &self.home_phone),
        ];
        fields
            .into_iter()
            .filter_map(|(attribute, value)| {
                value.as_ref().map(|value| (attribute, value.as_str()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_has_no_replacements() {
        let update = ProfileUpdate::new();
        assert!(update.is_empty());
        assert!(update.replacements().is_empty());
    }

    #[test]
    fn replacements_follow_declaration_order() {
        let update = ProfileUpdate::new()
            .with_mobile("+81-90-0000-0000")
            .with_sn("Doe")
            .with_title("Librarian");
        assert_eq!(
            update.replacements(),
            vec![
                ("sn", "Doe"),
                ("title", "Librarian"),
                ("mobile", "+81-90-0000-0000"),
            ]
        );
    }

    #[test]
    fn full_name_derives_cn() {
        let update = ProfileUpdate::new().with_full_name("Jane", "Doe");
        assert_eq!(update.cn.as_deref(), Some("Jane Doe"));
        assert_eq!(update.given_name.as_deref(), Some("Jane"));
        assert_eq!(update.sn.as_deref(), Some("Doe"));
    }

    #[test]
    fn unset_fields_are_not_replaced() {
        let update = ProfileUpdate::new().with_description("on sabbatical");
        assert_eq!(
            update.replacements(),
            vec![("description", "on sabbatical")]
        );
    }
}
