//! Convert a recovered `GRIB.BIN` log (or a raw radio capture) into CSV.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use telemetry_proto::{Packet, PacketScanner};

#[derive(Parser, Debug)]
#[command(name = "grib-decode", version, about = "Decode GRIB telemetry logs to CSV")]
struct Args {
    /// Binary log or capture file
    input: PathBuf,

    /// Output CSV path (defaults to `<input>.csv`)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

const HEADER: &str = "start;team_id;time;temp_bmp280;pressure_bmp280;\
acceleration_x;acceleration_y;acceleration_z;angular_x;angular_y;angular_z;\
checksum_header;number_packet;state;photoresistor;mag_x;mag_y;mag_z;ds18b20;\
latitude;longitude;gps_height;gps_fix;co2;methane;oxygen;checksum";

fn write_row<W: Write>(out: &mut W, p: &Packet) -> io::Result<()> {
    writeln!(
        out,
        "{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{}",
        p.start,
        p.team_id,
        p.time_ms,
        p.temperature_centi,
        p.pressure,
        p.acceleration[0],
        p.acceleration[1],
        p.acceleration[2],
        p.angular_rate[0],
        p.angular_rate[1],
        p.angular_rate[2],
        p.header_checksum,
        p.sequence,
        p.status.bits(),
        p.light,
        p.magnetic[0],
        p.magnetic[1],
        p.magnetic[2],
        p.probe_temperature,
        p.latitude,
        p.longitude,
        p.gps_altitude,
        p.gps_fix,
        p.co2,
        p.methane,
        p.oxygen,
        p.checksum,
    )
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let data = fs::read(&args.input)?;

    let output = args.output.unwrap_or_else(|| {
        let mut path = args.input.clone().into_os_string();
        path.push(".csv");
        PathBuf::from(path)
    });
    let mut out = BufWriter::new(fs::File::create(&output)?);
    writeln!(out, "{HEADER}")?;

    let mut scanner = PacketScanner::new(&data);
    let mut decoded = 0usize;
    for packet in scanner.by_ref() {
        write_row(&mut out, &packet)?;
        decoded += 1;
    }
    out.flush()?;

    eprintln!(
        "{}: {} packets, {} bytes skipped, {} trailing -> {}",
        args.input.display(),
        decoded,
        scanner.skipped(),
        scanner.remainder().len(),
        output.display()
    );
    Ok(())
}
