use super::EtaRequest;

/// Prompt asking the model for a terse motorcycle ETA plus a traffic-volume label.
pub fn build_prompt(request: &EtaRequest) -> String {
    format!(
        "Estimate motorcycle ETA in minutes.\n\
         Distance: {} km\n\
         Origin: {}\n\
         Destination: {}\n\
         Assume Philippine traffic conditions with moderate congestion.\n\
         Answer as briefly as possible.\n\
         Also state the traffic volume: light, moderate or heavy.",
        request.distance_km, request.origin, request.destination
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_trip_inputs() {
        let prompt = build_prompt(&EtaRequest {
            distance_km: 2.5,
            origin: "14.83, 120.28".to_string(),
            destination: "Gordon College Main Campus".to_string(),
        });
        assert!(prompt.contains("Distance: 2.5 km"));
        assert!(prompt.contains("Origin: 14.83, 120.28"));
        assert!(prompt.contains("Destination: Gordon College Main Campus"));
        assert!(prompt.contains("light, moderate or heavy"));
    }
}
