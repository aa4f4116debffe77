use crate::core::Client;
use crate::utils::error::{Result, SorteoError};
use std::collections::HashMap;

/// Reduces an identifier to its ASCII letters and digits, upper-cased.
///
/// `30-71234567-8`, `30.71234567.8` and `30712345678` all normalize to `30712345678`.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// CUIT/DNI 對應客戶 ID 的索引
#[derive(Debug, Clone)]
pub struct IdentifierIndex {
    normalize: bool,
    keys: HashMap<String, String>,
}

impl IdentifierIndex {
    pub fn build<'a>(clients: impl IntoIterator<Item = &'a Client>, normalize: bool) -> Result<Self> {
        let mut index = Self {
            normalize,
            keys: HashMap::new(),
        };

        for client in clients {
            for identifier in [client.tax_id(), client.national_id()] {
                index.insert(identifier, client.id())?;
            }
        }

        Ok(index)
    }

    fn key(&self, identifier: &str) -> String {
        if self.normalize {
            normalize_identifier(identifier)
        } else {
            identifier.to_string()
        }
    }

    fn insert(&mut self, identifier: &str, client_id: &str) -> Result<()> {
        let key = self.key(identifier);
        if key.trim().is_empty() {
            return Ok(());
        }

        match self.keys.get(&key) {
            Some(existing) if existing != client_id => Err(SorteoError::ConfigValidationError {
                field: "clients.tax_id/national_id".to_string(),
                message: format!(
                    "identifier '{}' matches both client {} and client {}",
                    identifier, existing, client_id
                ),
            }),
            _ => {
                self.keys.insert(key, client_id.to_string());
                Ok(())
            }
        }
    }

    pub fn find(&self, identifier: &str) -> Option<&str> {
        let key = self.key(identifier);
        if key.trim().is_empty() {
            return None;
        }
        self.keys.get(&key).map(String::as_str)
    }

    pub fn normalizes(&self) -> bool {
        self.normalize
    }
}

/// Operator search: name contains the query (case-insensitive), or either identifier contains it.
pub fn search_clients<'a>(clients: &'a [Client], query: &str, normalize: bool) -> Vec<&'a Client> {
    let query = query.trim();
    if query.is_empty() {
        return clients.iter().collect();
    }

    let name_query = query.to_lowercase();
    let id_query = if normalize {
        normalize_identifier(query)
    } else {
        query.to_string()
    };
    let id_matches = |identifier: &str| {
        if id_query.is_empty() {
            return false;
        }
        if normalize {
            normalize_identifier(identifier).contains(&id_query)
        } else {
            identifier.contains(&id_query)
        }
    };

    clients
        .iter()
        .filter(|c| {
            c.name().to_lowercase().contains(&name_query)
                || id_matches(c.tax_id())
                || id_matches(c.national_id())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TierId;

    fn clients() -> Vec<Client> {
        vec![
            Client::new(
                "1".into(),
                "Distribuidora Norte S.A.".into(),
                "30-71234567-8".into(),
                "27345678".into(),
                TierId::Diamante,
            ),
            Client::new(
                "2".into(),
                "Comercial del Sur S.R.L.".into(),
                "30-65432198-1".into(),
                "31987654".into(),
                TierId::Oro,
            ),
        ]
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("30-71234567-8"), "30712345678");
        assert_eq!(normalize_identifier(" 27.345.678 "), "27345678");
        assert_eq!(normalize_identifier("ab-12"), "AB12");
        assert_eq!(normalize_identifier("--"), "");
    }

    #[test]
    fn test_find_by_tax_or_national_id() {
        let clients = clients();
        let index = IdentifierIndex::build(&clients, true).unwrap();

        assert_eq!(index.find("30-71234567-8"), Some("1"));
        assert_eq!(index.find("30712345678"), Some("1"));
        assert_eq!(index.find("31987654"), Some("2"));
        assert_eq!(index.find("31.987.654"), Some("2"));
        assert_eq!(index.find("99999999"), None);
        assert_eq!(index.find(""), None);
        assert_eq!(index.find(" - "), None);
    }

    #[test]
    fn test_exact_matching_when_normalization_disabled() {
        let clients = clients();
        let index = IdentifierIndex::build(&clients, false).unwrap();

        assert_eq!(index.find("30-71234567-8"), Some("1"));
        assert_eq!(index.find("30712345678"), None);
        assert!(!index.normalizes());
    }

    #[test]
    fn test_colliding_identifiers_rejected() {
        let mut clients = clients();
        clients.push(Client::new(
            "3".into(),
            "Otra".into(),
            "307123456-78".into(),
            "40567891".into(),
            TierId::Plata,
        ));
        assert!(IdentifierIndex::build(&clients, true).is_err());
        assert!(IdentifierIndex::build(&clients, false).is_ok());
    }

    #[test]
    fn test_search_clients() {
        let clients = clients();

        let by_name: Vec<&str> = search_clients(&clients, "norte", true).iter().map(|c| c.id()).collect();
        assert_eq!(by_name, vec!["1"]);

        let by_partial_cuit: Vec<&str> = search_clients(&clients, "654321", true).iter().map(|c| c.id()).collect();
        assert_eq!(by_partial_cuit, vec!["2"]);

        assert_eq!(search_clients(&clients, "", true).len(), 2);
        assert!(search_clients(&clients, "Córdoba", true).is_empty());
    }
}
