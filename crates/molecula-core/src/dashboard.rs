//! Admin dashboard statistics.
//!
//! The figures are fixed reference values; they do not reflect the store.

use molecula_types::{ChartDataset, ChartSeries, DashboardStats, HeadlineStats, QueryType};

/// Build the admin dashboard payload.
pub fn dashboard_stats() -> DashboardStats {
    DashboardStats {
        stats: HeadlineStats {
            total_users: 1248,
            active_users: 876,
            total_queries: 15782,
            average_response_time: 1.2,
        },
        user_activity: ChartSeries {
            labels: labels(&["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul"]),
            datasets: vec![
                dataset(
                    "Active Users",
                    &[650.0, 730.0, 810.0, 790.0, 850.0, 870.0, 876.0],
                ),
                dataset("New Users", &[120.0, 85.0, 90.0, 70.0, 95.0, 80.0, 75.0]),
            ],
        },
        query_types: ChartSeries {
            labels: QueryType::ALL
                .iter()
                .map(|kind| kind.label().to_owned())
                .collect(),
            datasets: vec![dataset(
                "Query Distribution",
                &[4215.0, 3842.0, 2103.0, 3521.0, 2101.0],
            )],
        },
        model_performance: ChartSeries {
            labels: labels(&[
                "Solubility",
                "Toxicity",
                "Drug-likeness",
                "Target Prediction",
                "Interaction",
            ]),
            datasets: vec![dataset("Accuracy", &[0.87, 0.82, 0.91, 0.78, 0.84])],
        },
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|&v| v.to_owned()).collect()
}

fn dataset(label: &str, data: &[f64]) -> ChartDataset {
    ChartDataset {
        label: label.to_owned(),
        data: data.to_vec(),
    }
}
