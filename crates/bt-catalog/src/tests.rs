//! Unit tests for bt-catalog.

#[cfg(test)]
mod fallback {
    use crate::fallback_routes;

    #[test]
    fn three_valid_routes() {
        let routes = fallback_routes().unwrap();
        let ids: Vec<&str> = routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(routes[0].color, "#FF0000");
        assert_eq!(routes[1].color, "#0000FF");
        assert_eq!(routes[2].color, "#00FF00");
        assert_eq!(routes[1].vertices().len(), 6);
    }

    #[test]
    fn coordinates_are_lon_lat_ordered() {
        let routes = fallback_routes().unwrap();
        let first = routes[0].vertices()[0];
        assert_eq!(first.lon, 77.5702);
        assert_eq!(first.lat, 12.9779);
    }
}

#[cfg(test)]
mod csv_loader {
    use std::io::Cursor;

    use crate::{load_routes_reader, CatalogError};

    const CSV: &[u8] = b"\
route_id,name,color,seq,longitude,latitude\n\
1,Majestic - Indiranagar,#FF0000,1,77.5843,12.9754\n\
7,Loop,#00FF00,0,77.60,12.90\n\
1,Majestic - Indiranagar,#FF0000,0,77.5702,12.9779\n\
7,Loop,#00FF00,1,77.61,12.91\n\
1,Majestic - Indiranagar,#FF0000,2,77.6078,12.9744\n\
";

    #[test]
    fn groups_and_orders_by_seq() {
        let routes = load_routes_reader(Cursor::new(CSV)).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].id.as_str(), "1");
        assert_eq!(routes[0].name, "Majestic - Indiranagar");
        let lons: Vec<f64> = routes[0].vertices().iter().map(|p| p.lon).collect();
        assert_eq!(lons, [77.5702, 77.5843, 77.6078]);
        assert_eq!(routes[1].id.as_str(), "7");
        assert_eq!(routes[1].vertices().len(), 2);
    }

    #[test]
    fn single_vertex_route_rejected() {
        let csv = b"route_id,name,color,seq,longitude,latitude\n9,Stub,#123456,0,77.6,12.9\n";
        let err = load_routes_reader(Cursor::new(&csv[..])).unwrap_err();
        assert!(matches!(err, CatalogError::Route(_)), "{err}");
    }

    #[test]
    fn duplicate_seq_rejected() {
        let csv = b"route_id,name,color,seq,longitude,latitude\n\
9,X,#000000,0,77.6,12.9\n\
9,X,#000000,0,77.7,12.8\n";
        assert!(matches!(load_routes_reader(Cursor::new(&csv[..])), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn bad_number_is_parse_error() {
        let csv = b"route_id,name,color,seq,longitude,latitude\n9,X,#000000,0,east,12.9\n";
        assert!(matches!(load_routes_reader(Cursor::new(&csv[..])), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn header_only_is_empty() {
        let csv = b"route_id,name,color,seq,longitude,latitude\n";
        assert!(matches!(load_routes_reader(Cursor::new(&csv[..])), Err(CatalogError::Empty)));
    }
}

#[cfg(test)]
mod json_loader {
    use std::io::Cursor;

    use crate::{load_routes_json_reader, CatalogError};

    #[test]
    fn parses_linestring_and_defaults_color() {
        let json = br##"[
            {"id": "a", "name": "With color", "color": "#ABCDEF",
             "path": {"type": "LineString", "coordinates": [[77.57, 12.97], [77.58, 12.98]]}},
            {"id": "b", "name": "No color",
             "path": {"type": "LineString", "coordinates": [[77.60, 12.90], [77.61, 12.91], [77.62, 12.92]]}}
        ]"##;
        let routes = load_routes_json_reader(Cursor::new(&json[..])).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].color, "#ABCDEF");
        assert_eq!(routes[1].color, "#000000");
        assert_eq!(routes[1].vertices().len(), 3);
        assert_eq!(routes[0].vertices()[0].lat, 12.97);
    }

    #[test]
    fn rejects_non_linestring() {
        let json = br#"[{"id": "a", "name": "P", "path": {"type": "Point", "coordinates": [[77.57, 12.97]]}}]"#;
        assert!(matches!(load_routes_json_reader(Cursor::new(&json[..])), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let json = br#"[{"id": "a", "name": "P", "path": {"type": "LineString", "coordinates": [[77.57, 12.97], [77.58, 95.0]]}}]"#;
        assert!(matches!(load_routes_json_reader(Cursor::new(&json[..])), Err(CatalogError::Route(_))));
    }
}

#[cfg(test)]
mod files {
    use std::io::Write;

    use crate::{load_routes, CatalogError};

    #[test]
    fn dispatches_on_extension() {
        let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(csv, "route_id,name,color,seq,longitude,latitude").unwrap();
        writeln!(csv, "1,A,#FF0000,0,77.5702,12.9779").unwrap();
        writeln!(csv, "1,A,#FF0000,1,77.5843,12.9754").unwrap();
        csv.flush().unwrap();
        assert_eq!(load_routes(csv.path()).unwrap().len(), 1);

        let mut json = tempfile::Builder::new().suffix(".JSON").tempfile().unwrap();
        write!(
            json,
            r#"[{{"id":"1","name":"A","path":{{"type":"LineString","coordinates":[[77.5702,12.9779],[77.5843,12.9754]]}}}}]"#
        )
        .unwrap();
        json.flush().unwrap();
        assert_eq!(load_routes(json.path()).unwrap()[0].color, "#000000");
    }

    #[test]
    fn unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(matches!(load_routes(file.path()), Err(CatalogError::UnsupportedFormat(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("routes.csv");
        assert!(matches!(load_routes(&missing), Err(CatalogError::Io(_))));
    }
}
