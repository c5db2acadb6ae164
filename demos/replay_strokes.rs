//! Replay a short recorded touch stream and print the session report

fn main() {
    let ndjson = r#"
{"phase":"begin","touch_id":1,"x":40,"y":300,"force":1.1,"max_force":6.67,"major_radius":21.5,"uptime_ms":1000,"timestamp":"2024-01-15T14:00:00Z"}
{"phase":"move","touch_id":1,"x":120,"y":310,"uptime_ms":1040,"timestamp":"2024-01-15T14:00:00.040Z"}
{"phase":"move","touch_id":1,"x":200,"y":306,"uptime_ms":1080,"timestamp":"2024-01-15T14:00:00.080Z"}
{"phase":"end","touch_id":1,"x":260,"y":300,"uptime_ms":1120,"timestamp":"2024-01-15T14:00:00.120Z"}
{"phase":"begin","touch_id":2,"x":150,"y":420,"force":2.4,"max_force":6.67,"uptime_ms":2000,"timestamp":"2024-01-15T14:00:01Z"}
{"phase":"end","touch_id":2,"x":150,"y":420,"uptime_ms":2095,"timestamp":"2024-01-15T14:00:01.095Z","target":{"x":0,"y":380,"width":320,"height":80}}
"#;

    let samples = match synheart_touch::SampleParser::parse_ndjson(ndjson) {
        Ok(samples) => samples,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    let start = samples[0].timestamp;
    let mut session = match synheart_touch::Session::new(Default::default(), start) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    if let Err(e) = session.replay(&samples) {
        eprintln!("Error: {e}");
        return;
    }

    match serde_json::to_string_pretty(&session.report()) {
        Ok(report) => println!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
