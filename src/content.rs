//! News, weather and health content spoken alongside a reminder.
//!
//! Providers never fail outright: anything that goes wrong while fetching is
//! logged and turned into empty content so the alarm still rings.

use std::time::Duration;

use log::{info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::{
    config::{HealthConfig, NewsConfig, WeatherConfig},
    error::FetchError,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// field selection sent to the area statistics endpoint
const HEALTH_STRUCTURE: &str = r#"{"date":"date","areaName":"areaName","newCasesByPublishDate":"newCasesByPublishDate","cumCasesByPublishDate":"cumCasesByPublishDate","newDeathsByDeathDate":"newDeathsByDeathDate"}"#;

/// How much of a news item should be read out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// title only
    #[default]
    Brief,
    /// title followed by the article body
    Extended,
}

impl From<bool> for Depth {
    fn from(extended: bool) -> Self {
        if extended {
            Self::Extended
        } else {
            Self::Brief
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub content: Option<String>,
    pub depth: Depth,
}

impl NewsItem {
    /// Same title and body, whatever depth it was fetched at.
    #[must_use]
    pub fn is_same_article(&self, other: &Self) -> bool {
        self.title == other.title && self.content == other.content
    }
}

pub trait ContentProvider: Send + Sync {
    /// Up to `count` news items, skipping anything in `exclude`.
    fn news(&self, count: usize, exclude: &[NewsItem]) -> Vec<NewsItem>;

    /// A spoken weather summary, or an empty string.
    fn weather(&self) -> String;

    /// A spoken public-health summary, or an empty string.
    fn health(&self) -> String;
}

/// Provider used when nothing is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl ContentProvider for NoContent {
    fn news(&self, _count: usize, _exclude: &[NewsItem]) -> Vec<NewsItem> {
        Vec::new()
    }

    fn weather(&self) -> String {
        String::new()
    }

    fn health(&self) -> String {
        String::new()
    }
}

#[derive(Debug, Deserialize)]
struct Headlines {
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WeatherReport {
    weather: Vec<Conditions>,
    main: Readings,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Conditions {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct AreaStatistics {
    data: Vec<AreaDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AreaDay {
    new_cases_by_publish_date: Option<i64>,
    cum_cases_by_publish_date: Option<i64>,
    new_deaths_by_death_date: Option<i64>,
}

fn select_news(headlines: Headlines, count: usize, depth: Depth, exclude: &[NewsItem]) -> Vec<NewsItem> {
    headlines
        .articles
        .into_iter()
        .filter(|article| article.description.is_some())
        .map(|article| NewsItem {
            title: article.title,
            content: article.description,
            depth,
        })
        .filter(|item| !exclude.iter().any(|hidden| hidden.is_same_article(item)))
        .take(count)
        .collect()
}

fn describe_weather(report: &WeatherReport, extended: bool) -> Result<String, FetchError> {
    let conditions = report.weather.first().ok_or(FetchError::Malformed("weather"))?;
    let mut msg = format!(
        "The weather is {} and it is {} degrees celsius which feels like {} degrees celsius. ",
        conditions.description, report.main.temp, report.main.feels_like
    );
    if extended {
        msg.push_str(&format!(
            "The humidity is {} percent and the wind speed {} kilometers per hour.",
            report.main.humidity, report.wind.speed
        ));
    }
    Ok(msg)
}

fn describe_health(stats: &AreaStatistics, extended: bool) -> Result<String, FetchError> {
    let today = stats.data.first().ok_or(FetchError::Malformed("data[0]"))?;
    let new_cases = today
        .new_cases_by_publish_date
        .ok_or(FetchError::Malformed("newCasesByPublishDate"))?;
    let total_cases = today
        .cum_cases_by_publish_date
        .ok_or(FetchError::Malformed("cumCasesByPublishDate"))?;
    let mut msg =
        format!("Today there have been {new_cases} new cases bringing the total to {total_cases} . ");
    if extended {
        let yesterday = stats.data.get(1).ok_or(FetchError::Malformed("data[1]"))?;
        let cases = yesterday
            .new_cases_by_publish_date
            .ok_or(FetchError::Malformed("newCasesByPublishDate"))?;
        let deaths = yesterday
            .new_deaths_by_death_date
            .ok_or(FetchError::Malformed("newDeathsByDeathDate"))?;
        msg.push_str(&format!(
            "Yesterday there was {cases} new cases and {deaths} new deaths"
        ));
    }
    Ok(msg)
}

/// Fetches content from NewsAPI, OpenWeather and the UK area statistics API.
#[derive(Debug, Clone)]
pub struct HttpContentProvider {
    client: Client,
    news: NewsConfig,
    weather: WeatherConfig,
    health: HealthConfig,
}

impl HttpContentProvider {
    /// # Errors
    /// if the http client can't be built (e.g. no TLS backend)
    pub fn new(
        news: NewsConfig,
        weather: WeatherConfig,
        health: HealthConfig,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            news,
            weather,
            health,
        })
    }

    fn fetch_news(&self, count: usize, exclude: &[NewsItem]) -> Result<Vec<NewsItem>, FetchError> {
        let headlines: Headlines = self
            .client
            .get(&self.news.base_url)
            .query(&[
                ("country", self.news.country.as_str()),
                ("sortBy", "popularity"),
                ("apiKey", self.news.key.as_str()),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(select_news(
            headlines,
            count,
            self.news.extended.into(),
            exclude,
        ))
    }

    fn fetch_weather(&self) -> Result<String, FetchError> {
        let report: WeatherReport = self
            .client
            .get(&self.weather.base_url)
            .query(&[
                ("q", self.weather.city.as_str()),
                ("units", "metric"),
                ("appid", self.weather.key.as_str()),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        describe_weather(&report, self.weather.extended)
    }

    fn fetch_health(&self) -> Result<String, FetchError> {
        let filters = format!(
            "areaType={};areaName={}",
            self.health.area_type, self.health.area_name
        );
        let stats: AreaStatistics = self
            .client
            .get(&self.health.base_url)
            .query(&[("filters", filters.as_str()), ("structure", HEALTH_STRUCTURE)])
            .send()?
            .error_for_status()?
            .json()?;
        describe_health(&stats, self.health.extended)
    }
}

impl ContentProvider for HttpContentProvider {
    fn news(&self, count: usize, exclude: &[NewsItem]) -> Vec<NewsItem> {
        match self.fetch_news(count, exclude) {
            Ok(items) => {
                info!("news data returned ({} items)", items.len());
                items
            }
            Err(e) => {
                warn!("couldn't fetch news: {e}");
                Vec::new()
            }
        }
    }

    fn weather(&self) -> String {
        self.fetch_weather().unwrap_or_else(|e| {
            warn!("couldn't fetch weather: {e}");
            String::new()
        })
    }

    fn health(&self) -> String {
        self.fetch_health().unwrap_or_else(|e| {
            warn!("couldn't fetch health statistics: {e}");
            String::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADLINES: &str = r#"{
        "status": "ok",
        "articles": [
            {"title": "No body", "description": null},
            {"title": "First", "description": "first body"},
            {"title": "Second", "description": "second body"},
            {"title": "Third", "description": "third body"}
        ]
    }"#;

    #[test]
    fn news_skips_bodiless_and_excluded_articles() {
        let headlines: Headlines = serde_json::from_str(HEADLINES).unwrap();
        let dismissed = NewsItem {
            title: "First".to_string(),
            content: Some("first body".to_string()),
            depth: Depth::Brief,
        };
        let items = select_news(headlines, 2, Depth::Brief, &[dismissed]);
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Second", "Third"]);
    }

    #[test]
    fn excluded_article_stays_out_at_another_depth() {
        let headlines: Headlines = serde_json::from_str(HEADLINES).unwrap();
        let dismissed = NewsItem {
            title: "First".to_string(),
            content: Some("first body".to_string()),
            depth: Depth::Brief,
        };
        let items = select_news(headlines, 5, Depth::Extended, &[dismissed]);
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Second", "Third"]);
        assert!(items.iter().all(|item| item.depth == Depth::Extended));
    }

    #[test]
    fn news_stops_at_count() {
        let headlines: Headlines = serde_json::from_str(HEADLINES).unwrap();
        let items = select_news(headlines, 1, Depth::Extended, &[]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].depth, Depth::Extended);
    }

    #[test]
    fn weather_summary() {
        let report: WeatherReport = serde_json::from_str(
            r#"{
                "weather": [{"description": "light rain"}],
                "main": {"temp": 11.5, "feels_like": 9.25, "humidity": 80},
                "wind": {"speed": 4.1}
            }"#,
        )
        .unwrap();
        assert_eq!(
            describe_weather(&report, false).unwrap(),
            "The weather is light rain and it is 11.5 degrees celsius which feels like 9.25 degrees celsius. "
        );
        assert!(describe_weather(&report, true)
            .unwrap()
            .ends_with("The humidity is 80 percent and the wind speed 4.1 kilometers per hour."));
    }

    #[test]
    fn weather_without_conditions_is_malformed() {
        let report: WeatherReport = serde_json::from_str(
            r#"{"weather": [], "main": {"temp": 1, "feels_like": 1, "humidity": 1}, "wind": {"speed": 1}}"#,
        )
        .unwrap();
        assert!(matches!(
            describe_weather(&report, false),
            Err(FetchError::Malformed("weather"))
        ));
    }

    #[test]
    fn health_summary() {
        let stats: AreaStatistics = serde_json::from_str(
            r#"{"data": [
                {"newCasesByPublishDate": 120, "cumCasesByPublishDate": 5000, "newDeathsByDeathDate": 3},
                {"newCasesByPublishDate": 90, "cumCasesByPublishDate": 4880, "newDeathsByDeathDate": 2}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            describe_health(&stats, false).unwrap(),
            "Today there have been 120 new cases bringing the total to 5000 . "
        );
        assert!(describe_health(&stats, true)
            .unwrap()
            .ends_with("Yesterday there was 90 new cases and 2 new deaths"));
    }

    #[test]
    fn no_content_is_empty() {
        assert!(NoContent.news(3, &[]).is_empty());
        assert!(NoContent.weather().is_empty());
        assert!(NoContent.health().is_empty());
    }
}
