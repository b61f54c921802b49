use perilmail_db::NewEarthquake;
use perilmail_usgs::{EventQuery, FeedEarthquake, UsgsClient};

/// Fetch recent earthquakes from the USGS feed and upsert them.
///
/// # Errors
///
/// Returns an error if the bbox is malformed, the feed query fails, or the
/// upsert fails.
pub(crate) async fn run_ingest_quakes(
    pool: &sqlx::PgPool,
    config: &perilmail_core::Config,
    bbox: &str,
    hours: i64,
    min_magnitude: f64,
) -> anyhow::Result<()> {
    let bbox = parse_bbox(bbox)?;
    let client = UsgsClient::new(config.http_request_timeout_secs, &config.http_user_agent)?;

    let query = EventQuery {
        bbox,
        hours,
        min_magnitude,
    };
    let events = client.query_events(&query).await?;

    if events.is_empty() {
        println!("no earthquakes returned for the requested window");
        return Ok(());
    }

    let records: Vec<NewEarthquake> = events.iter().map(new_earthquake).collect();
    let (inserted, updated) = perilmail_db::upsert_earthquakes(pool, &records).await?;
    println!(
        "fetched {} earthquakes ({inserted} new, {updated} updated)",
        events.len()
    );

    Ok(())
}

fn new_earthquake(feed: &FeedEarthquake) -> NewEarthquake {
    NewEarthquake {
        external_id: feed.id.clone(),
        occurred_at: feed.occurred_at,
        latitude: feed.latitude,
        longitude: feed.longitude,
        magnitude: feed.magnitude,
        place: feed.place.clone(),
        depth_km: feed.depth_km,
        url: feed.url.clone(),
    }
}

fn parse_bbox(raw: &str) -> anyhow::Result<[f64; 4]> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|error| anyhow::anyhow!("invalid bbox {raw:?}: {error}"))?;

    let &[min_lng, min_lat, max_lng, max_lat] = parts.as_slice() else {
        anyhow::bail!("bbox must be four comma-separated values: minLng,minLat,maxLng,maxLat");
    };
    if min_lng >= max_lng || min_lat >= max_lat {
        anyhow::bail!("bbox minimums must be below maximums");
    }

    Ok([min_lng, min_lat, max_lng, max_lat])
}
