use mp4edit::known_boxes::{HANDLER_SOUND, HANDLER_VIDEO, MDIA, MOOV, MVHD, STSD, TRAK};
use mp4edit::payload::BoxData;
use mp4edit::registry::Placement;
use mp4edit::{BoxType, FactoryKey, Registry, default_registry};

fn t(s: &str) -> BoxType {
    s.parse().unwrap()
}

fn data() -> BoxData {
    BoxData::Container
}

fn cascade_registry() -> Registry {
    let (typ, parent, handler) = (t("abcd"), t("prnt"), t("hndl"));
    Registry::new()
        .with_constructor(FactoryKey::new(Some(typ), Some(parent), Some(handler)), "tph", data)
        .with_constructor(FactoryKey::new(Some(typ), Some(parent), None), "tp", data)
        .with_constructor(FactoryKey::new(Some(typ), None, None), "t", data)
}

#[test]
fn cascade_prefers_parent_match_over_generic() {
    let reg = cascade_registry();
    let e = reg
        .resolve(t("abcd"), Some(t("prnt")), Some(t("othr")))
        .unwrap();
    assert_eq!(e.name, "tp");
}

#[test]
fn cascade_most_specific_and_most_generic() {
    let reg = cascade_registry();
    let exact = reg.resolve(t("abcd"), Some(t("prnt")), Some(t("hndl"))).unwrap();
    assert_eq!(exact.name, "tph");
    let generic = reg.resolve(t("abcd"), Some(t("else")), Some(t("hndl"))).unwrap();
    assert_eq!(generic.name, "t");
    assert!(reg.resolve(t("zzzz"), None, None).is_none());
}

#[test]
fn cascade_type_and_handler_without_parent() {
    let reg = Registry::new()
        .with_constructor(FactoryKey::new(Some(t("abcd")), None, Some(t("hndl"))), "th", data)
        .with_constructor(FactoryKey::of_type(t("abcd")), "t", data);
    assert_eq!(reg.resolve(t("abcd"), Some(t("prnt")), Some(t("hndl"))).unwrap().name, "th");
    assert_eq!(reg.resolve(t("abcd"), Some(t("prnt")), None).unwrap().name, "t");
}

#[test]
fn sample_entry_cascade() {
    let reg = Registry::new()
        .with_constructor(FactoryKey::new(None, Some(STSD), Some(HANDLER_SOUND)), "audio", data)
        .with_constructor(FactoryKey::new(None, Some(STSD), None), "generic", data)
        .with_constructor(FactoryKey::new(Some(t("mp4a")), Some(STSD), None), "mp4a", data);

    assert_eq!(
        reg.resolve_sample_entry(t("mp4a"), Some(STSD), Some(HANDLER_SOUND)).unwrap().name,
        "mp4a"
    );
    assert_eq!(
        reg.resolve_sample_entry(t("ac-3"), Some(STSD), Some(HANDLER_SOUND)).unwrap().name,
        "audio"
    );
    assert_eq!(
        reg.resolve_sample_entry(t("avc1"), Some(STSD), Some(HANDLER_VIDEO)).unwrap().name,
        "generic"
    );
    // the general cascade never looks at wildcard types
    assert!(reg.resolve(t("ac-3"), Some(STSD), Some(HANDLER_SOUND)).is_none());
}

#[test]
fn default_registry_payloads() {
    let reg = default_registry();
    let general = |p: Option<BoxType>| Placement {
        parent: p,
        handler: None,
        sample_entry: false,
    };

    assert!(matches!(reg.construct(MOOV, general(None)).1, BoxData::Container));
    assert!(matches!(reg.construct(TRAK, general(Some(MOOV))).1, BoxData::Container));
    assert!(matches!(reg.construct(MVHD, general(Some(MOOV))).1, BoxData::MovieHeader(_)));
    assert!(matches!(reg.construct(t("zzzz"), general(Some(MDIA))).1, BoxData::Data(_)));

    let entry = |h| Placement {
        parent: Some(STSD),
        handler: Some(h),
        sample_entry: true,
    };
    assert!(matches!(
        reg.construct(t("mp4a"), entry(HANDLER_SOUND)).1,
        BoxData::AudioSampleEntry(_)
    ));
    assert!(matches!(
        reg.construct(t("avc1"), entry(HANDLER_VIDEO)).1,
        BoxData::VisualSampleEntry(_)
    ));
    assert!(matches!(
        reg.construct(t("tx3g"), entry(t("text"))).1,
        BoxData::SampleEntry(_)
    ));
}

#[test]
fn later_registration_replaces_earlier() {
    let reg = Registry::new()
        .with_constructor(FactoryKey::of_type(t("abcd")), "first", data)
        .with_constructor(FactoryKey::of_type(t("abcd")), "second", data);
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.resolve(t("abcd"), None, None).unwrap().name, "second");
}

#[test]
fn shared_registry_is_populated_once() {
    let a = Registry::shared() as *const Registry;
    let b = Registry::shared() as *const Registry;
    assert_eq!(a, b);
    assert!(!Registry::shared().is_empty());
}
