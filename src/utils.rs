//! Utility functions.

use rust_decimal::Decimal;
use tracing::info;

/// Resolve when the process receives Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Format a side A price for display (two decimals).
pub fn format_side_a(price: Decimal) -> String {
    format!("{:.2}", price.round_dp(2))
}

/// Format a side B price for display: three decimals below 10, two above.
pub fn format_side_b(price: Decimal) -> String {
    if price < Decimal::TEN {
        format!("{:.3}", price.round_dp(3))
    } else {
        format!("{:.2}", price.round_dp(2))
    }
}

/// Format a percentage with an explicit sign and one decimal.
pub fn format_signed_pct(pct: Decimal) -> String {
    let rounded = pct.round_dp(1);
    if rounded >= Decimal::ZERO {
        format!("+{:.1}%", rounded)
    } else {
        format!("{:.1}%", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn side_b_precision_depends_on_magnitude() {
        assert_eq!(format_side_b(dec!(1.0246)), "1.025");
        assert_eq!(format_side_b(dec!(12.5)), "12.50");
        assert_eq!(format_side_a(dec!(14.0826)), "14.08");
    }

    #[test]
    fn signed_pct_shows_sign() {
        assert_eq!(format_signed_pct(dec!(42.857)), "+42.9%");
        assert_eq!(format_signed_pct(dec!(-8.04)), "-8.0%");
        assert_eq!(format_signed_pct(Decimal::ZERO), "+0.0%");
    }
}
