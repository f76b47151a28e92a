use serde::{Deserialize, Serialize};

/// Search filters sent with every listing page request.
///
/// Values are forwarded verbatim; an empty string means "no filter" to the site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// City to search in
    pub cidade: String,
    /// Neighborhood within the city
    pub bairro: String,
    /// Property category (house, apartment, ...)
    pub categoria_imovel: String,
    pub tipo: String,
    /// Minimum price
    #[serde(rename = "precoMin", alias = "precomin")]
    pub preco_min: String,
    /// Maximum price
    #[serde(rename = "precoMax", alias = "precomax")]
    pub preco_max: String,
    /// Minimum number of bedrooms
    pub quartos: String,
    /// Minimum number of bathrooms
    pub banheiros: String,
    /// Rent or sale
    #[serde(rename = "tipoOperacao", alias = "tipooperacao")]
    pub tipo_operacao: String,
    pub id_only_integrador: String,
    pub id_integrador: String,
    /// Sort order
    pub order_by: String,
}

impl SearchParams {
    /// Query pairs for a 1-based page number, in a stable order
    pub fn query_pairs(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("cidade", self.cidade.clone()),
            ("bairro", self.bairro.clone()),
            ("categoria_imovel", self.categoria_imovel.clone()),
            ("tipo", self.tipo.clone()),
            ("precoMin", self.preco_min.clone()),
            ("precoMax", self.preco_max.clone()),
            ("quartos", self.quartos.clone()),
            ("banheiros", self.banheiros.clone()),
            ("tipoOperacao", self.tipo_operacao.clone()),
            ("id_only_integrador", self.id_only_integrador.clone()),
            ("id_integrador", self.id_integrador.clone()),
            ("order_by", self.order_by.clone()),
            ("page", page.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_last_query_pair() {
        let params = SearchParams {
            cidade: "Franca".to_string(),
            ..Default::default()
        };
        let pairs = params.query_pairs(3);

        assert_eq!(pairs.first(), Some(&("cidade", "Franca".to_string())));
        assert_eq!(pairs.last(), Some(&("page", "3".to_string())));
    }

    #[test]
    fn deserializes_site_parameter_names() {
        let json = r#"{"cidade": "Franca", "precoMax": "3000", "tipoOperacao": "locacao"}"#;
        let params: SearchParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.preco_max, "3000");
        assert_eq!(params.tipo_operacao, "locacao");
        assert_eq!(params.bairro, "");
    }
}
