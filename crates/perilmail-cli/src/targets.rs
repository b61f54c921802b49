use perilmail_core::{bounding_box, select_earthquake_targets, Candidate, EarthquakeCriteria, GeoPoint};

pub(crate) struct TargetsArgs {
    pub earthquake_id: String,
    pub max_distance_km: f64,
    pub min_house_value: i64,
    pub include_insured: bool,
    pub limit: usize,
    pub json: bool,
}

/// Run the earthquake targeting pipeline read-only and print the selection.
///
/// # Errors
///
/// Returns an error if the earthquake is unknown, has no coordinates, or a
/// database query fails.
pub(crate) async fn run_targets(pool: &sqlx::PgPool, args: &TargetsArgs) -> anyhow::Result<()> {
    let quake = perilmail_db::find_earthquake(pool, &args.earthquake_id)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "earthquake '{}' not found; run `ingest-quakes` first",
                args.earthquake_id
            )
        })?;
    let (Some(latitude), Some(longitude)) = (quake.latitude, quake.longitude) else {
        anyhow::bail!(
            "earthquake '{}' has no coordinates to target around",
            args.earthquake_id
        );
    };

    let criteria = EarthquakeCriteria {
        max_distance_km: args.max_distance_km,
        min_house_value: args.min_house_value,
        require_uninsured: !args.include_insured,
        limit: args.limit,
        ..EarthquakeCriteria::default()
    };

    let epicenter = GeoPoint::new(latitude, longitude);
    let bbox = bounding_box(epicenter, criteria.max_distance_km);
    let fetch_limit = i64::try_from(criteria.limit.saturating_mul(2)).unwrap_or(i64::MAX);
    let rows =
        perilmail_db::find_persons_in_bbox(pool, &bbox, criteria.min_house_value, None, fetch_limit)
            .await?;
    let candidates: Vec<Candidate> = rows.into_iter().map(Candidate::from).collect();
    let targets = select_earthquake_targets(epicenter, quake.magnitude, candidates, &criteria);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    let magnitude = quake
        .magnitude
        .map_or_else(|| "?".to_string(), |m| format!("{m:.1}"));
    let place = quake.place.as_deref().unwrap_or("unknown location");
    println!("Earthquake: {} (M{magnitude}, {place})", quake.external_id);
    println!(
        "Targets: {} within {} km",
        targets.len(),
        criteria.max_distance_km
    );

    if targets.is_empty() {
        println!("no targets matched; try widening --max-distance-km or seeding more persons");
        return Ok(());
    }

    println!();
    let header = format!(
        "{:<8}{:<10}{:<24}{:<18}{:<12}EMAIL",
        "RISK", "KM", "NAME", "CITY", "VALUE"
    );
    println!("{header}");
    for target in &targets {
        let person = &target.candidate;
        let name = format!("{} {}", person.first_name, person.last_name);
        let distance = format!("{:.1}", target.distance_km);
        let value = format!("${}", person.house_value);
        println!(
            "{:<8}{:<10}{:<24}{:<18}{:<12}{}",
            target.risk_level.as_str(),
            distance,
            name,
            person.city,
            value,
            person.email
        );
    }

    Ok(())
}
