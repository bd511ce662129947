use wadash_core::SentimentFilter;

use crate::resolver::DateWindow;
use crate::AnalyticsError;

/// The common selection every multi-assembly aggregation takes.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub assemblies: Vec<String>,
    pub window: DateWindow,
    pub sentiment: SentimentFilter,
}

impl AnalysisRequest {
    /// Validates the selection in the order the dashboard reports problems:
    /// assemblies first, then dates.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if no assembly is selected or the
    /// date window is invalid.
    pub fn new(
        assemblies: Vec<String>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        sentiment: Option<&str>,
    ) -> Result<Self, AnalyticsError> {
        let mut assemblies: Vec<String> = assemblies
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        // A repeated selection would count every file twice.
        let mut seen = std::collections::HashSet::new();
        assemblies.retain(|a| seen.insert(a.clone()));
        if assemblies.is_empty() {
            return Err(AnalyticsError::validation(
                "Please select at least one assembly",
            ));
        }
        let window = DateWindow::parse(start_date, end_date)?;
        Ok(Self {
            assemblies,
            window,
            sentiment: SentimentFilter::parse(sentiment),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemblies_are_checked_before_dates() {
        let err = AnalysisRequest::new(vec![" ".to_string()], None, None, None).unwrap_err();
        assert_eq!(err.to_string(), "Please select at least one assembly");
    }

    #[test]
    fn sentiment_defaults_to_all() {
        let req =
            AnalysisRequest::new(vec!["North".to_string()], Some("2025-01-15"), None, None)
                .unwrap();
        assert_eq!(req.sentiment, SentimentFilter::All);
        assert_eq!(req.assemblies, vec!["North"]);
    }

    #[test]
    fn repeated_assemblies_collapse_in_order() {
        let req = AnalysisRequest::new(
            vec!["South".into(), "North".into(), "South ".into()],
            Some("2025-01-15"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(req.assemblies, vec!["South", "North"]);
    }
}
