use shotboard::{
    Asset, AssetRole, Board, BoardAction, BoardEvent, BoardLimits, ShotUpdate, StoryCursor,
    StudioError,
};
use uuid::Uuid;

fn create_shot(board: &mut Board) -> Uuid {
    match board.dispatch(BoardAction::CreateShot).unwrap() {
        BoardEvent::ShotCreated(id) => id,
        other => panic!("expected ShotCreated, got {:?}", other),
    }
}

fn png(role: AssetRole, file_name: &str) -> Asset {
    Asset::from_bytes(role, file_name, "image/png", b"\x89PNG")
}

#[test]
fn test_upload_beyond_limit_leaves_partition_unchanged() {
    let mut board = Board::new(BoardLimits::default());
    for i in 0..4 {
        board
            .dispatch(BoardAction::AddAsset(png(AssetRole::Model, &format!("model{}.png", i))))
            .unwrap();
    }
    let before: Vec<Uuid> = board.assets().list(AssetRole::Model).iter().map(|a| a.id).collect();

    let result = board.dispatch(BoardAction::AddAsset(png(AssetRole::Model, "extra.png")));
    assert!(matches!(
        result,
        Err(StudioError::UploadLimitExceeded { role: AssetRole::Model, max: 4 })
    ));

    let after: Vec<Uuid> = board.assets().list(AssetRole::Model).iter().map(|a| a.id).collect();
    assert_eq!(before, after);
    assert_eq!(board.assets().len(AssetRole::Garment), 0);
}

#[test]
fn test_deleting_garment_empties_selection() {
    let mut board = Board::default();
    let dress = png(AssetRole::Garment, "red_dress.png");
    let dress_id = dress.id;
    assert_eq!(dress.name, "red_dress");
    board.dispatch(BoardAction::AddAsset(dress)).unwrap();

    let shot = create_shot(&mut board);
    board
        .dispatch(BoardAction::ToggleGarment { shot, garment: dress_id })
        .unwrap();
    assert_eq!(board.shots().get(shot).unwrap().selected_garment_ids, vec![dress_id]);

    board
        .dispatch(BoardAction::RemoveAsset { role: AssetRole::Garment, id: dress_id })
        .unwrap();
    assert!(board.shots().get(shot).unwrap().selected_garment_ids.is_empty());
}

#[test]
fn test_deleting_pose_only_clears_matching_shots() {
    let mut board = Board::default();
    let stance = png(AssetRole::Pose, "stance.png");
    let walk = png(AssetRole::Pose, "walk.png");
    let (stance_id, walk_id) = (stance.id, walk.id);
    board.dispatch(BoardAction::AddAsset(stance)).unwrap();
    board.dispatch(BoardAction::AddAsset(walk)).unwrap();

    let a = create_shot(&mut board);
    let b = create_shot(&mut board);
    board.dispatch(BoardAction::SelectPose { shot: a, pose: Some(stance_id) }).unwrap();
    board.dispatch(BoardAction::SelectPose { shot: b, pose: Some(walk_id) }).unwrap();

    board
        .dispatch(BoardAction::RemoveAsset { role: AssetRole::Pose, id: stance_id })
        .unwrap();
    assert_eq!(board.shots().get(a).unwrap().selected_pose_id, None);
    assert_eq!(board.shots().get(b).unwrap().selected_pose_id, Some(walk_id));
}

#[test]
fn test_reorder_then_remove_example() {
    let mut board = Board::default();
    let shot1 = create_shot(&mut board);
    let shot2 = create_shot(&mut board);

    board.dispatch(BoardAction::ReorderShots { from: 0, to: 1 }).unwrap();
    assert_eq!(board.shots().ids(), vec![shot2, shot1]);

    board.dispatch(BoardAction::RemoveShot(shot1)).unwrap();
    assert_eq!(board.shots().ids(), vec![shot2]);
}

#[test]
fn test_story_walks_generated_shots_only() {
    let mut board = Board::default();
    let first = create_shot(&mut board);
    let _blank = create_shot(&mut board);
    let third = create_shot(&mut board);
    for id in [first, third] {
        board
            .dispatch(BoardAction::UpdateShot {
                id,
                update: ShotUpdate {
                    generated_image: Some(Some("data:image/png;base64,AA==".into())),
                    ..Default::default()
                },
            })
            .unwrap();
    }

    let frames = board.shots().generated().len();
    assert_eq!(frames, 2);

    let mut cursor = StoryCursor::default();
    assert_eq!(cursor.current(&board).unwrap().id, first);
    cursor.next(frames);
    assert_eq!(cursor.current(&board).unwrap().id, third);
    cursor.next(frames);
    assert_eq!(cursor.current(&board).unwrap().id, first);
}
