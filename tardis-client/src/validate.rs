use crate::error::ReplayError;
use chrono::{DateTime, Utc};
use core_types::time::parse_utc_instant;
use core_types::types::Channel;
use core_types::venues;

pub(crate) fn time_range(
    from_date: &str,
    to_date: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ReplayError> {
    let from = parse_utc_instant(from_date).ok_or_else(|| {
        invalid(format!(
            "'from_date' is not an ISO date or datetime: {from_date:?}"
        ))
    })?;
    let to = parse_utc_instant(to_date).ok_or_else(|| {
        invalid(format!(
            "'to_date' is not an ISO date or datetime: {to_date:?}"
        ))
    })?;
    if from >= to {
        return Err(invalid(format!(
            "'from_date' ({from}) must be earlier than 'to_date' ({to})"
        )));
    }
    Ok((from, to))
}

pub(crate) fn exchange_filters(exchange: &str, filters: &[Channel]) -> Result<(), ReplayError> {
    if exchange.is_empty() {
        return Err(invalid("'exchange' must not be empty".to_string()));
    }
    if !venues::is_known_exchange(exchange) {
        return Err(invalid(format!(
            "unknown 'exchange' {exchange:?}; expected one of: {}",
            venues::EXCHANGES.join(", ")
        )));
    }
    let known = venues::channels_for(exchange).unwrap_or(&[]);
    for filter in filters {
        if !known.contains(&filter.name.as_str()) {
            return Err(invalid(format!(
                "channel {:?} is not available on {exchange}; expected one of: {}",
                filter.name,
                known.join(", ")
            )));
        }
        if filter.symbols.iter().any(|symbol| symbol.is_empty()) {
            return Err(invalid(format!(
                "channel {:?} has an empty symbol",
                filter.name
            )));
        }
    }
    Ok(())
}

fn invalid(message: String) -> ReplayError {
    ReplayError::InvalidArgument(message)
}
