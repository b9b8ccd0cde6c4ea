use cube_blast::core::{LevelCatalog, LevelData, Rules, Session};
use cube_blast::term::{AdapterStatusView, GameView, Hud, TerminalRenderer, Viewport};
use cube_blast::types::ItemKind;

fn playing_session() -> Session {
    let level = LevelData::from_rows(
        2,
        7,
        &["r g b y", "ba p du hro"],
        &[(ItemKind::Green, 3)],
    );
    let mut session = Session::new(Rules::default(), LevelCatalog::from_levels([level])).unwrap();
    session.start_level(2).unwrap();
    session
}

#[test]
fn term_view_frames_the_board() {
    let snap = playing_session().snapshot();
    let view = GameView::default();
    let vp = Viewport::new(60, 20);
    let fb = view.render(&snap, &Hud::default(), vp);

    // 4 cells * 2 columns + border.
    let (x0, y0) = view.cell_origin(&snap, vp, 0, 0);
    assert_eq!(fb.get(x0 - 1, y0 - 1).unwrap().ch, '┌');
    assert_eq!(fb.get(x0 + 8, y0 - 1).unwrap().ch, '┐');
    assert_eq!(fb.get(x0 - 1, y0 + 2).unwrap().ch, '└');
    assert_eq!(fb.get(x0 + 8, y0 + 2).unwrap().ch, '┘');

    let (x, y) = view.cell_origin(&snap, vp, 3, 1);
    assert_eq!(fb.get(x, y).unwrap().ch, '◀');
    assert_eq!(fb.get(x + 1, y).unwrap().ch, '▶');
}

#[test]
fn term_view_lists_goals_and_adapter_port() {
    let snap = playing_session().snapshot();
    let hud = Hud {
        cursor: None,
        adapter: Some(AdapterStatusView { port: 7878 }),
    };
    let fb = GameView::default().render(&snap, &hud, Viewport::new(60, 24));

    let text: Vec<String> = (0..fb.height()).map(|y| fb.row_text(y)).collect();
    assert!(text.iter().any(|row| row.contains("balloon 1")));
    assert!(text.iter().any(|row| row.contains("duck 1")));
    assert!(text.iter().any(|row| row.contains("green 3")));
    assert!(text.iter().any(|row| row.contains("ON :7878")));
}

#[test]
fn renderer_diffs_against_previous_frame() {
    let mut session = playing_session();
    let view = GameView::default();
    let vp = Viewport::new(60, 20);
    let mut renderer = TerminalRenderer::with_writer(Vec::new());

    let fb = view.render(&session.snapshot(), &Hud::default(), vp);
    renderer.present(&fb).unwrap();
    let full = renderer.into_inner();

    let mut renderer = TerminalRenderer::with_writer(Vec::new());
    renderer.present(&fb).unwrap();
    session.pause();
    let paused = view.render(&session.snapshot(), &Hud::default(), vp);
    renderer.present(&paused).unwrap();
    let both = renderer.into_inner().len();
    assert!(both - full.len() < full.len());
}
