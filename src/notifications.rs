use std::sync::Arc;

use log::info;

use crate::content::{ContentProvider, NewsItem};

pub const HEALTH_TITLE: &str = "Covid Info";
pub const WEATHER_TITLE: &str = "Weather Info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub content: String,
    /// the article behind a news notification
    pub source: Option<NewsItem>,
}

impl From<NewsItem> for Notification {
    fn from(item: NewsItem) -> Self {
        Self {
            title: item.title.clone(),
            content: item.content.clone().unwrap_or_default(),
            source: Some(item),
        }
    }
}

/// News feed shown next to the alarms. Dismissed articles stay hidden.
pub struct NotificationFeed {
    content: Arc<dyn ContentProvider>,
    dismissed: Vec<NewsItem>,
}

impl std::fmt::Debug for NotificationFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationFeed")
            .field("dismissed", &self.dismissed)
            .finish_non_exhaustive()
    }
}

impl NotificationFeed {
    #[must_use]
    pub fn new(content: Arc<dyn ContentProvider>) -> Self {
        Self {
            content,
            dismissed: vec![],
        }
    }

    /// Fresh notifications: the health and weather cards first when `extras`
    /// is set, then up to `quantity` news items that haven't been dismissed.
    #[must_use]
    pub fn refresh(&self, quantity: usize, extras: bool) -> Vec<Notification> {
        info!("notifications being refreshed");
        let mut notifications = vec![];
        if extras {
            notifications.push(Notification {
                title: HEALTH_TITLE.to_string(),
                content: self.content.health(),
                source: None,
            });
            notifications.push(Notification {
                title: WEATHER_TITLE.to_string(),
                content: self.content.weather(),
                source: None,
            });
        }
        notifications.extend(
            self.content
                .news(quantity, &self.dismissed)
                .into_iter()
                .map(Notification::from),
        );
        notifications
    }

    /// Hide the notification titled `title` from later refreshes.
    ///
    /// Returns false if `current` has no such notification. The health and
    /// weather cards can't be dismissed.
    pub fn dismiss(&mut self, title: &str, current: &[Notification]) -> bool {
        let Some(item) = current
            .iter()
            .find(|notification| notification.title == title)
            .and_then(|notification| notification.source.clone())
        else {
            return false;
        };
        info!("notification `{title}` dismissed");
        self.dismissed.push(item);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Depth;

    struct Wire;

    impl ContentProvider for Wire {
        fn news(&self, count: usize, exclude: &[NewsItem]) -> Vec<NewsItem> {
            ["Alpha", "Beta", "Gamma", "Delta"]
                .into_iter()
                .map(|title| NewsItem {
                    title: title.to_string(),
                    content: Some(format!("{title} body")),
                    depth: Depth::Brief,
                })
                .filter(|item| !exclude.iter().any(|hidden| hidden.is_same_article(item)))
                .take(count)
                .collect()
        }

        fn weather(&self) -> String {
            "Dry".to_string()
        }

        fn health(&self) -> String {
            "Quiet".to_string()
        }
    }

    fn titles(notifications: &[Notification]) -> Vec<&str> {
        notifications.iter().map(|n| n.title.as_str()).collect()
    }

    #[test]
    fn extras_come_first() {
        let feed = NotificationFeed::new(Arc::new(Wire));
        let notifications = feed.refresh(2, true);
        assert_eq!(titles(&notifications), [HEALTH_TITLE, WEATHER_TITLE, "Alpha", "Beta"]);
        assert_eq!(notifications[0].content, "Quiet");
    }

    #[test]
    fn dismissed_news_stays_hidden() {
        let mut feed = NotificationFeed::new(Arc::new(Wire));
        let current = feed.refresh(2, false);
        assert!(feed.dismiss("Alpha", &current));
        assert_eq!(titles(&feed.refresh(2, false)), ["Beta", "Gamma"]);
    }

    #[test]
    fn unknown_and_extra_cards_are_not_dismissed() {
        let mut feed = NotificationFeed::new(Arc::new(Wire));
        let current = feed.refresh(1, true);
        assert!(!feed.dismiss("Nope", &current));
        assert!(!feed.dismiss(WEATHER_TITLE, &current));
        assert_eq!(feed.refresh(1, true).len(), 3);
    }
}
