use image::ImageReader;
use rovermap::{CycleInput, EvidenceChannel, Perception, PerceptionConfig, RoverPose};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 5 {
        eprintln!(
            "Usage: {} <frame.png> <x> <y> <yaw_deg> [summary.json]",
            args[0]
        );
        std::process::exit(2);
    }

    let frame = ImageReader::open(&args[1])?.decode()?.to_rgb8();
    let pose = RoverPose::new(args[2].parse()?, args[3].parse()?, args[4].parse()?);

    let perception = Perception::new(PerceptionConfig::default())?;
    let mut map = perception.new_world_map();
    let out = perception.process(&CycleInput { frame: &frame, pose }, &mut map)?;

    println!(
        "Classified {} navigable, {} obstacle, {} rock pixels.",
        out.counts.navigable, out.counts.obstacle, out.counts.rock
    );
    println!(
        "Map cells: {} navigable, {} obstacle, {} rock.",
        map.count(EvidenceChannel::Navigable),
        map.count(EvidenceChannel::Obstacle),
        map.count(EvidenceChannel::Rock)
    );
    match out.navigation.mean_angle_deg() {
        Some(angle) => println!("Mean heading: {angle:.1} deg"),
        None => println!("No navigable terrain in view."),
    }

    if let Some(out_path) = args.get(5) {
        let json = serde_json::to_string_pretty(&out.navigation)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
