use uuid::Uuid;

use crate::database::Database;

/// Prefix used for generated relation names when no session overrides it.
pub const DEFAULT_PREFIX: &str = "cte";

/// Generate a name of the form `<prefix>_<random hex>`.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

pub(crate) fn prefix_for(db: Option<&Database>) -> String {
    match db {
        Some(db) => db.config().cte_prefix.clone(),
        None => DEFAULT_PREFIX.to_string(),
    }
}

/// Quote an identifier, escaping embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names() {
        let a = unique_name("cte");
        let b = unique_name("cte");
        assert_ne!(a, b);
        assert!(a.starts_with("cte_"));
        assert_eq!(4 + 32, a.len());
        assert!(a[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn quoting() {
        assert_eq!("\"id\"", quote_ident("id"));
        assert_eq!("\"a\"\"b\"", quote_ident("a\"b"));
    }
}
