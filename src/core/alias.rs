use std::collections::HashMap;

/// Maps lowercase aliases to canonical uppercase currency codes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    /// Builds the table from `{ code: [alias, ...] }`, as found in settings.
    pub fn from_config(config: &HashMap<String, Vec<String>>) -> Self {
        let aliases = config
            .iter()
            .flat_map(|(code, aliases)| {
                let code = code.to_uppercase();
                aliases
                    .iter()
                    .map(move |alias| (alias.to_lowercase(), code.clone()))
            })
            .collect();
        Self { aliases }
    }

    /// Resolves a raw token to a currency code. Unknown tokens pass through
    /// upper-cased.
    pub fn resolve(&self, token: &str) -> String {
        let token = token.to_lowercase();
        self.aliases
            .get(&token)
            .cloned()
            .unwrap_or(token)
            .to_uppercase()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
