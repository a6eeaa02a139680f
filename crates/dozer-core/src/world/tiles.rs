use serde::{Deserialize, Serialize};

/// Cell contents for the classic reward mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tile {
    Empty = 0,
    Wall = 1,
    Goal = 3,
    Reward = 4,
    Agent = 6,
}

impl Tile {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Tiles that pay out and end the episode when driven onto.
    pub fn is_pickup(self) -> bool {
        matches!(self, Tile::Goal | Tile::Reward)
    }
}

#[derive(Clone, Debug)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::Empty; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.tiles.fill(Tile::Empty);
    }

    /// Tile at a cell; `None` off the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<Tile> {
        if x < self.width && y < self.height {
            Some(self.tiles[y * self.width + x])
        } else {
            None
        }
    }

    /// Returns `false` and leaves the grid unchanged when the cell is off the grid.
    pub fn set(&mut self, x: usize, y: usize, tile: Tile) -> bool {
        if x < self.width && y < self.height {
            self.tiles[y * self.width + x] = tile;
            true
        } else {
            false
        }
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }
}
