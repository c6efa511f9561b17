// src/common/i18n.rs

use std::collections::HashMap;

// Catálogos embutidos no binário: não dependem do diretório de execução.
const CATALOGS: &[(&str, &str)] = &[
    ("pt", include_str!("../../locales/pt.json")),
    ("en", include_str!("../../locales/en.json")),
];

const DEFAULT_LANG: &str = "en";

/// Mensagens traduzidas por idioma. Montado uma vez no `AppState`.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Catálogo '{}' inválido: {}", lang, e))?;
            catalogs.insert(lang.to_string(), messages);
        }
        Ok(Self { catalogs })
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    /// Busca a mensagem no idioma pedido, cai para o inglês e por fim para a própria chave.
    /// Parâmetros substituem `{nome}` no texto.
    pub fn translate(&self, lang: &str, key: &str, params: &[(&str, String)]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|c| c.get(key))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|c| c.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string());

        params.iter().fold(template, |msg, (name, value)| {
            msg.replace(&format!("{{{}}}", name), value)
        })
    }

    /// Mensagens de validação são códigos ("required", "not_negative"...).
    /// Código sem tradução volta como está.
    pub fn validation_message(&self, lang: &str, code: &str) -> String {
        let key = format!("validation.{}", code);
        let msg = self.translate(lang, &key, &[]);
        if msg == key { code.to_string() } else { msg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_then_to_key() {
        let store = I18nStore::load().unwrap();

        assert_eq!(store.translate("de", "error.internal", &[]), store.translate("en", "error.internal", &[]));
        assert_eq!(store.translate("pt", "chave.inexistente", &[]), "chave.inexistente");
    }

    #[test]
    fn replaces_named_params() {
        let store = I18nStore::load().unwrap();

        let msg = store.translate("en", "error.notFound", &[("entity", "Sale".to_string())]);

        assert!(msg.starts_with("Sale"));
        assert!(!msg.contains("{entity}"));
    }

    #[test]
    fn every_portuguese_key_exists_in_english() {
        let store = I18nStore::load().unwrap();
        let pt = &store.catalogs["pt"];
        let en = &store.catalogs["en"];

        let missing: Vec<_> = pt.keys().filter(|k| !en.contains_key(*k)).collect();
        assert!(missing.is_empty(), "faltando em en.json: {:?}", missing);
    }
}
