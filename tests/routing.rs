use vibes::routing::Routes;

#[test]
fn full_label_set() {
    let routes = Routes::new("bar-app", "apps.example.com", 4000)
        .network("web")
        .entrypoint("https")
        .cert_resolver("le");

    let labels: Vec<(String, String)> = routes.labels().into_iter().collect();

    let expected = [
        ("traefik.enable", "true"),
        ("traefik.docker.network", "web"),
        (
            "traefik.http.routers.bar_app.rule",
            "Host(`apps.example.com`) && PathPrefix(`/app/bar-app`)",
        ),
        ("traefik.http.routers.bar_app.entrypoints", "https"),
        ("traefik.http.routers.bar_app.tls", "true"),
        ("traefik.http.routers.bar_app.tls.certresolver", "le"),
        (
            "traefik.http.middlewares.bar_app_strip.stripprefix.prefixes",
            "/app/bar-app",
        ),
        ("traefik.http.routers.bar_app.middlewares", "bar_app_strip"),
        ("traefik.http.routers.bar_app.service", "bar_app"),
        (
            "traefik.http.services.bar_app.loadbalancer.server.port",
            "4000",
        ),
    ];
    let expected: Vec<(String, String)> = expected
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    assert_eq!(labels, expected);
}

#[test]
fn router_name_has_no_hyphens() {
    let routes = Routes::new("a-b-c", "h", 80);

    assert_eq!(routes.router(), "a_b_c");
    assert_eq!(routes.middleware(), "a_b_c_strip");
    assert_eq!(routes.path_prefix(), "/app/a-b-c");
}

#[test]
fn distinct_apps_get_distinct_routers() {
    let a = Routes::new("one", "h", 3000).labels();
    let b = Routes::new("two", "h", 3000).labels();

    let shared: Vec<&String> = a
        .keys()
        .filter(|k| k.as_str() != "traefik.enable" && b.contains_key(*k))
        .collect();
    assert!(shared.is_empty(), "{shared:?}");
}
