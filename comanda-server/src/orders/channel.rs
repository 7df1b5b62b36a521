//! Channel classifier
//!
//! Decides which intake surface produced an order from its provenance
//! tags. Rules are evaluated in strict priority order, first match wins:
//!
//! 1. `source_domain` contains a partner-site pattern → PartnerSite
//! 2. `channel` / `origin` is a kiosk marker → Kiosk
//! 3. `channel` / `origin` is an online-menu marker, or `source_domain`
//!    is non-empty → OnlineMenu
//! 4. otherwise → PointOfSale

use serde::{Deserialize, Serialize};
use shared::order::Order;

/// Intake channel of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderChannel {
    PartnerSite,
    OnlineMenu,
    Kiosk,
    PointOfSale,
}

impl OrderChannel {
    pub const ALL: [OrderChannel; 4] = [
        OrderChannel::PartnerSite,
        OrderChannel::OnlineMenu,
        OrderChannel::Kiosk,
        OrderChannel::PointOfSale,
    ];

    /// Orders that arrive without an operator and go through accept-and-print
    pub fn requires_acceptance(self) -> bool {
        !matches!(self, OrderChannel::PointOfSale)
    }

    pub fn is_site(self) -> bool {
        matches!(self, OrderChannel::PartnerSite | OrderChannel::OnlineMenu)
    }

    /// PDV = till or kiosk
    pub fn is_pdv(self) -> bool {
        matches!(self, OrderChannel::PointOfSale | OrderChannel::Kiosk)
    }

    /// Item name used when nothing else could be reconstructed
    pub fn fallback_item_name(self) -> &'static str {
        match self {
            OrderChannel::PartnerSite => "Pedido do site",
            OrderChannel::OnlineMenu => "Pedido do cardápio online",
            OrderChannel::Kiosk => "Pedido do totem",
            OrderChannel::PointOfSale => "Pedido balcão",
        }
    }
}

/// Marker tables for the classifier
#[derive(Debug, Clone)]
pub struct ChannelRules {
    /// Lowercased domain fragments of the partner storefront
    pub partner_site_patterns: Vec<String>,
    pub kiosk_markers: Vec<String>,
    pub online_menu_markers: Vec<String>,
}

impl ChannelRules {
    pub fn with_partner_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            partner_site_patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            ..Self::default()
        }
    }
}

impl Default for ChannelRules {
    fn default() -> Self {
        Self {
            partner_site_patterns: Vec::new(),
            kiosk_markers: ["kiosk", "totem", "autoatendimento", "self_service"]
                .map(String::from)
                .to_vec(),
            online_menu_markers: [
                "online_menu",
                "cardapio",
                "cardapio_online",
                "menu",
                "site",
                "web",
                "online",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Pure, deterministic channel classifier
#[derive(Debug, Clone, Default)]
pub struct ChannelClassifier {
    rules: ChannelRules,
}

impl ChannelClassifier {
    pub fn new(rules: ChannelRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ChannelRules {
        &self.rules
    }

    pub fn classify(&self, order: &Order) -> OrderChannel {
        self.classify_tags(
            order.channel.as_deref(),
            order.origin.as_deref(),
            order.source_domain.as_deref(),
        )
    }

    pub fn classify_tags(
        &self,
        channel: Option<&str>,
        origin: Option<&str>,
        source_domain: Option<&str>,
    ) -> OrderChannel {
        let domain = normalize(source_domain);
        let tags = [normalize(channel), normalize(origin)];

        if let Some(domain) = &domain
            && self
                .rules
                .partner_site_patterns
                .iter()
                .any(|p| !p.is_empty() && domain.contains(p.as_str()))
        {
            return OrderChannel::PartnerSite;
        }

        if tags
            .iter()
            .flatten()
            .any(|t| self.rules.kiosk_markers.iter().any(|m| m == t))
        {
            return OrderChannel::Kiosk;
        }

        if domain.is_some()
            || tags
                .iter()
                .flatten()
                .any(|t| self.rules.online_menu_markers.iter().any(|m| m == t))
        {
            return OrderChannel::OnlineMenu;
        }

        OrderChannel::PointOfSale
    }
}

/// Trimmed, lowercased, `None` when blank
fn normalize(tag: Option<&str>) -> Option<String> {
    tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ChannelClassifier {
        ChannelClassifier::new(ChannelRules::with_partner_patterns(["LojaParceira.com"]))
    }

    #[test]
    fn test_partner_domain_match_is_case_insensitive() {
        let c = classifier();
        assert_eq!(
            c.classify_tags(None, None, Some("  pedidos.lojaparceira.com.br ")),
            OrderChannel::PartnerSite
        );
    }

    #[test]
    fn test_kiosk_markers() {
        let c = classifier();
        assert_eq!(c.classify_tags(Some("TOTEM"), None, None), OrderChannel::Kiosk);
        assert_eq!(c.classify_tags(None, Some("kiosk"), None), OrderChannel::Kiosk);
    }

    #[test]
    fn test_online_menu_by_marker_or_unknown_domain() {
        let c = classifier();
        assert_eq!(c.classify_tags(Some("cardapio"), None, None), OrderChannel::OnlineMenu);
        assert_eq!(
            c.classify_tags(None, None, Some("meucardapio.app")),
            OrderChannel::OnlineMenu
        );
    }

    #[test]
    fn test_point_of_sale_default() {
        let c = classifier();
        assert_eq!(c.classify_tags(None, None, None), OrderChannel::PointOfSale);
        assert_eq!(c.classify_tags(Some("pdv"), Some(" "), Some("")), OrderChannel::PointOfSale);
    }

    #[test]
    fn test_partner_domain_always_wins() {
        let c = classifier();
        let tags = [None, Some("kiosk"), Some("totem"), Some("site"), Some("pdv"), Some("")];
        for channel in tags {
            for origin in tags {
                assert_eq!(
                    c.classify_tags(channel, origin, Some("lojaparceira.com")),
                    OrderChannel::PartnerSite,
                    "channel={channel:?} origin={origin:?}"
                );
            }
        }
    }

    #[test]
    fn test_kiosk_beats_online_signals() {
        let c = classifier();
        assert_eq!(
            c.classify_tags(Some("site"), Some("totem"), Some("outro.com")),
            OrderChannel::Kiosk
        );
    }

    #[test]
    fn test_no_patterns_means_no_partner() {
        let c = ChannelClassifier::default();
        assert_eq!(
            c.classify_tags(None, None, Some("lojaparceira.com")),
            OrderChannel::OnlineMenu
        );
    }

    #[test]
    fn test_repeated_calls_are_stable() {
        let c = classifier();
        let first = c.classify_tags(Some("web"), None, None);
        for _ in 0..5 {
            assert_eq!(c.classify_tags(Some("web"), None, None), first);
        }
    }
}
