pub mod browser;
pub mod catalog;
pub mod form;
pub mod mutator;
pub mod notice;
pub mod record_filter;
pub mod settings;
pub mod sql_generator;
pub mod store;

#[must_use]
pub fn domain_name() -> &'static str {
    "shelf-core"
}

#[cfg(test)]
mod tests {
    use super::domain_name;

    #[test]
    fn domain_name_is_stable() {
        assert_eq!(domain_name(), "shelf-core");
    }
}
