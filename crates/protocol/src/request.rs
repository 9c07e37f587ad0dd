/// Fields posted to the build-number command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildNumRequest {
    pub product: String,
    /// Three-part `major.minor.patch` version, without the build component.
    pub version: String,
    pub commit: String,
}

impl BuildNumRequest {
    pub fn new(
        product: impl Into<String>,
        version: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            version: version.into(),
            commit: commit.into(),
        }
    }

    /// Form fields in wire order.
    pub fn form_fields(&self) -> [(&str, &str); 3] {
        [
            ("product", self.product.as_str()),
            ("version", self.version.as_str()),
            ("commit", self.commit.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields_order() {
        let request = BuildNumRequest::new("app", "1.2.3", "abc123");
        assert_eq!(
            request.form_fields(),
            [("product", "app"), ("version", "1.2.3"), ("commit", "abc123")]
        );
    }

    #[test]
    fn test_form_fields_allow_empty_values() {
        let request = BuildNumRequest::new("", "0.0.1", "");
        let fields = request.form_fields();
        assert_eq!(fields[0], ("product", ""));
        assert_eq!(fields[2], ("commit", ""));
    }
}
