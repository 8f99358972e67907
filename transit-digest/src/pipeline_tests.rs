//! End-to-end runs of the orchestrator against canned sources.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::{TempDir, tempdir};

use crate::config::{DigestConfig, SummerWindow};
use crate::domain::Direction;
use crate::error::DigestError;
use crate::fetch::MockFetcher;
use crate::pipeline::{Digester, digest, prefetch_sources};
use crate::schedule::ScheduleError;
use crate::source::TransitSource;
use crate::validate::Defect;

const STOPS_URI: &str = "http://bus.example/lineas?codLinea={line}";
const SCHEDULE_URI: &str =
    "http://bus.example/horario?codLinea={line}&parada={stop}&temporada={season}";

const LINE_LIST: &str = r#"<select name="lineas">
    <option value="0000" selected="selected">Seleccione una l&iacute;nea</option>
    <option value="03">03 - MOON - PLUTO URANO</option>
    <option value="46">46 - EARTH - SUNSUNSUN</option>
</select>"#;

const STOPS_TXT: &str = "stop_id,stop_code,stop_name,stop_desc,stop_lat,stop_lon\n\
                         0253,253,Arangoiti,,43.2630,-2.9350\n\
                         0254,254,Zumaia,,43.2631,-2.9351\n\
                         0300,300,Txurdinaga,,43.2700,-2.9200\n";

fn winter() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()
}

fn config() -> DigestConfig {
    let window =
        SummerWindow::parse("2024-06-24T00:00:00+02:00", "2024-09-08T23:59:59+02:00").unwrap();
    DigestConfig::default().with_summer_window(window)
}

fn stop_row(tag: &str, line: &str, id: &str, name: &str, connections: &[&str]) -> String {
    let links: String = connections
        .iter()
        .map(|c| format!("<a href=\"lineas?codLinea={c}&amp;sentido=1\"> {c} </a>\n"))
        .collect();
    format!(
        "<tr>\n\
         <td headers=\"parada_{tag}\"><span class=\"num\">1</span>{name}</td>\n\
         <td><a href=\"horario-estimado?codLinea={line}&amp;temporada=IN&amp;parada={id}\">Horario</a></td>\n\
         <td><a href=\"https://maps.google.com/?q=0,0\">Mapa</a></td>\n\
         <td headers=\"correspondencias_{tag} correspondencia_parada\">\n{links}</td>\n\
         </tr>\n"
    )
}

fn line_03_page() -> String {
    [
        stop_row("ida", "03", "0253", "Arangoiti", &[]),
        stop_row("ida", "03", "0254", "Zumaia", &["46"]),
        stop_row("vuelta", "03", "0254", "Zumaia", &["46"]),
        stop_row("vuelta", "03", "0253", "Arangoiti", &[]),
    ]
    .concat()
}

fn line_46_page() -> String {
    [
        stop_row("ida", "46", "0254", "Zumaia", &["03"]),
        stop_row("ida", "46", "0300", "Txurdinaga", &[]),
        stop_row("vuelta", "46", "0300", "Txurdinaga", &[]),
        stop_row("vuelta", "46", "0254", "Zumaia", &["03", "99"]),
    ]
    .concat()
}

/// Winter weekday departures for both directions of a line at one stop.
fn schedule_page(line: &str) -> String {
    ["1", "2"]
        .iter()
        .flat_map(|direction| {
            ["06:30", "07:00"].map(|time| {
                format!(
                    "<a href=\"horario-estimado?codLinea={line}&amp;temporada=IN&amp;servicio=7\
                     &amp;tipodia=LA&amp;sentido={direction}&amp;hora={time}\">{time}</a>\n"
                )
            })
        })
        .collect()
}

fn schedule_uri(line: &str, stop: &str) -> String {
    format!("http://bus.example/horario?codLinea={line}&parada={stop}&temporada=IN")
}

fn fetcher() -> MockFetcher {
    let mut fetcher = MockFetcher::new()
        .with_page("http://bus.example/lineas?codLinea=03", line_03_page())
        .with_page("http://bus.example/lineas?codLinea=46", line_46_page());
    for (line, stop) in [("03", "0253"), ("03", "0254"), ("46", "0254"), ("46", "0300")] {
        fetcher = fetcher.with_page(schedule_uri(line, stop), schedule_page(line));
    }
    fetcher
}

fn write_gtfs(path: &Path) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    writer
        .start_file("stops.txt", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(STOPS_TXT.as_bytes()).unwrap();
    writer.finish().unwrap();
}

/// Local artifacts plus the full catalogue over them.
fn catalogue() -> (TempDir, Vec<TransitSource>) {
    let dir = tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("lines.html"), LINE_LIST).unwrap();
    std::fs::write(root.join("day.csv"), "id;name\n03;MOON - PLUTO URANO\n").unwrap();
    std::fs::write(root.join("night.csv"), "id;name\n46;EARTH - SUNSUNSUN\n").unwrap();
    write_gtfs(&root.join("gtfs.zip"));

    let sources = vec![
        TransitSource::new("AgencyLines", root.join("lines.html"), "http://bus.example/lineas"),
        TransitSource::new("Stops", root.join("stops"), STOPS_URI),
        TransitSource::new("Location", root.join("gtfs.zip"), "http://bus.example/gtfs.zip"),
        TransitSource::new("Schedule", root.join("schedules"), SCHEDULE_URI),
        TransitSource::new("DayLines", root.join("day.csv"), "http://bus.example/day.csv"),
        TransitSource::new("NightLines", root.join("night.csv"), "http://bus.example/night.csv"),
    ];
    (dir, sources)
}

#[tokio::test]
async fn csv_rows_make_one_forward_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lines.csv");
    std::fs::write(
        &path,
        "id;name;direction;order;stop_id;stop_name;short;connections\n\
         03;MOON - PLUTO URANO;Moon - Pluto Urano;1;0253;Arangoiti;;\n\
         03;MOON - PLUTO URANO;Moon - Pluto Urano;2;0254;Zumaia;;\n",
    )
    .unwrap();

    let mut digester = Digester::new(DigestConfig::default(), MockFetcher::new());
    digester
        .process(&TransitSource::new("Lines", &path, "http://bus.example/lines.csv"))
        .await
        .unwrap();

    let network = digester.network();
    assert_eq!(network.lines.len(), 1);
    let line = &network.lines[0];
    assert_eq!(line.id, "I03");
    assert_eq!(line.direction, Direction::Forward);
    assert_eq!(line.number, 3);
    let stops: Vec<_> = line.stops.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(stops, ["0253", "0254"]);
}

#[tokio::test]
async fn full_run_produces_a_consistent_network() {
    let (_dir, sources) = catalogue();

    let network = digest(&sources, config(), fetcher(), winter()).await.unwrap();

    let ids: Vec<_> = network.lines.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, ["I03", "V03", "I46", "V46"]);

    let v03 = network.line("V03").unwrap();
    assert_eq!(v03.name, "PLUTO URANO - MOON");
    assert_eq!(v03.stops[0].id, "0254");
    assert_eq!(v03.map_route[0].latitude, "43.2631");

    let i03 = network.line("I03").unwrap();
    assert_eq!(i03.stops[1].connections, ["I46"]);
    assert_eq!(i03.stops[0].schedule.weekday, "06:30,07:00");
    assert_eq!(i03.stops[0].schedule.friday, "06:30,07:00");

    // 99 serves no line and is dropped
    let v46 = network.line("V46").unwrap();
    assert_eq!(v46.stops[1].connections, ["I03"]);

    assert!(network.line("I46").unwrap().is_night_line);
    assert!(!i03.is_night_line);
    assert_eq!(network.day_lines.len(), 1);

    let stop_ids: Vec<_> = network.stops.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(stop_ids, ["0253", "0254", "0300"]);
    assert_eq!(network.version.as_ref().unwrap().version, "202402011000");
}

#[tokio::test]
async fn reverse_direction_pages_are_not_refetched() {
    let (_dir, sources) = catalogue();
    let mut digester = Digester::new(config(), fetcher()).with_reference_time(winter());
    digester.process_all(&sources[..2]).await.unwrap();

    let requests = digester.fetcher().requests();
    assert_eq!(
        requests,
        [
            "http://bus.example/lineas?codLinea=03",
            "http://bus.example/lineas?codLinea=46"
        ]
    );
}

#[tokio::test]
async fn missing_schedules_fail_validation() {
    let (_dir, sources) = catalogue();
    let fetcher = MockFetcher::new()
        .with_page("http://bus.example/lineas?codLinea=03", line_03_page())
        .with_page("http://bus.example/lineas?codLinea=46", line_46_page());

    let err = digest(&sources, config(), fetcher, winter()).await.unwrap_err();
    let err = match err {
        DigestError::Consistency(err) => err,
        other => panic!("expected a consistency error, got {other}"),
    };
    assert_eq!(err.line, "I03");
    assert_eq!(err.defect, Defect::StopWithoutSchedule("0253".into()));
}

#[tokio::test]
async fn undetermined_season_halts_the_run() {
    let (_dir, sources) = catalogue();
    let mut digester =
        Digester::new(DigestConfig::default(), fetcher()).with_reference_time(winter());

    let err = digester.process_all(&sources).await.unwrap_err();
    assert!(matches!(
        err,
        DigestError::Schedule(ScheduleError::SeasonUndetermined)
    ));
}

#[tokio::test]
async fn unknown_sources_are_skipped() {
    let (dir, mut sources) = catalogue();
    sources.insert(
        0,
        TransitSource::new("Trams", dir.path().join("trams.csv"), "http://bus.example/trams"),
    );

    let network = digest(&sources, config(), fetcher(), winter()).await.unwrap();
    assert_eq!(network.lines.len(), 4);
}

#[tokio::test]
async fn configured_names_replace_published_ones() {
    let (_dir, sources) = catalogue();
    let config = config().with_line_name("03", "MOON - URANUS");

    let network = digest(&sources, config, fetcher(), winter()).await.unwrap();
    assert_eq!(network.line("I03").unwrap().name, "MOON - URANUS");
    assert_eq!(network.line("V03").unwrap().name, "URANUS - MOON");
}

#[tokio::test]
async fn ignored_lines_are_left_out() {
    let (_dir, sources) = catalogue();
    let config = config().with_ignored_line("46");
    let mut digester = Digester::new(config, fetcher()).with_reference_time(winter());
    digester.process_all(&sources).await.unwrap();
    let network = digester.finish();

    assert!(network.lines.iter().all(|l| l.agency_id == "03"));
    // Connections to the ignored line were never recorded
    assert!(network.line("I03").unwrap().stops[1].connections.is_empty());
}

#[tokio::test]
async fn unresolved_connections_are_reported() {
    let (_dir, sources) = catalogue();
    let mut digester = Digester::new(config(), fetcher()).with_reference_time(winter());
    digester.process_all(&sources).await.unwrap();
    let (network, connections) = digester.finish_with_report();

    assert_eq!(connections.unresolved.len(), 1);
    let unresolved = &connections.unresolved[0];
    assert_eq!(unresolved.line, "V46");
    assert_eq!(unresolved.stop, "0254");
    assert_eq!(unresolved.code, "99");
    assert!(connections.resolved > 0);
    assert_eq!(network.line("V46").unwrap().stops[1].connections, ["I03"]);
}

#[tokio::test]
async fn prefetch_downloads_whole_sources_only() {
    let dir = tempdir().unwrap();
    let lines = dir.path().join("lines.html");
    let day = dir.path().join("day.csv");
    std::fs::write(&day, "id;name\n").unwrap();

    let sources = vec![
        TransitSource::new("AgencyLines", &lines, "http://bus.example/lineas"),
        TransitSource::new("DayLines", &day, "http://bus.example/day.csv"),
        TransitSource::new("Stops", dir.path().join("stops"), STOPS_URI),
    ];
    let fetcher = MockFetcher::new()
        .with_page("http://bus.example/lineas", LINE_LIST)
        .with_page("http://bus.example/day.csv", "id;name\n03;MOON - PLUTO URANO\n");

    let config = DigestConfig::default().with_reuse_cached(true);
    assert_eq!(prefetch_sources(&sources, &config, &fetcher).await, 1);
    assert_eq!(fetcher.requests(), ["http://bus.example/lineas"]);
    assert_eq!(std::fs::read_to_string(&lines).unwrap(), LINE_LIST);

    let fresh = DigestConfig::default();
    assert_eq!(prefetch_sources(&sources, &fresh, &fetcher).await, 2);
}

#[tokio::test]
async fn prefetch_replaces_empty_local_copies() {
    let dir = tempdir().unwrap();
    let day = dir.path().join("day.csv");
    std::fs::write(&day, "").unwrap();

    let sources = vec![TransitSource::new("DayLines", &day, "http://bus.example/day.csv")];
    let fetcher =
        MockFetcher::new().with_page("http://bus.example/day.csv", "id;name\n03;MOON - PLUTO URANO\n");

    let config = DigestConfig::default().with_reuse_cached(true);
    assert_eq!(prefetch_sources(&sources, &config, &fetcher).await, 1);
    assert!(std::fs::read_to_string(&day).unwrap().starts_with("id;name"));
}
