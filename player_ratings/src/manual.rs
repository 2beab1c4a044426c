/*!

This is the long-form manual for `player_ratings` and `spurs-survey`.

## Workflow

Each match goes through the same steps, all driven by `spurs-survey`:

1. `fetch <match id>` downloads the match from the ESPN API and writes
   `data/matches/<id>/match_data.json`. Fields the API does not report
   (usually the coach) are asked for on the terminal.
2. `create-survey <id>` creates the Google Form and writes `form.json`.
3. `compile <id>` reads the answers (from the form, or from an exported
   spreadsheet with `--responses`) and writes `results.json`.
4. `infographic <id>` renders `infographic.png` from the results.
5. `build-site` collects every match into the archive directory.

`run <id>` chains every step. It pauses after creating the form until the
responses are in, then asks for the quote and the photo of the match.

## Match data

`match_data.json` holds one match:

```text
{
  "match_id": 740843,
  "home_team": "Tottenham Hotspur",
  "away_team": "Manchester United",
  "competition": "English Premier League",
  "matchday": "Matchday 1",
  "date": "2026-02-07",
  "venue": "Tottenham Hotspur Stadium",
  "formation": "4-2-3-1",
  "coach": "Thomas Frank",
  "starting_players": [{"name": "Guglielmo Vicario", "position": "GK", "image_path": null}, ...],
  "substitutions": [{"player_in": "Richarlison", "player_out": "Dominic Solanke", "minute": 70}],
  "goals": [{"scorer": "Dominic Solanke", "assist": "Pedro Porro", "minute": 32, "own_goal": false}],
  "is_tottenham_home": true,
  "home_score": 2,
  "away_score": 0
}
```

`goals`, `substitutions` and the scores are optional. A record is complete
when every text field is filled and the lineup has exactly 11 players.

## Response exports

Instead of reading the form through the API, `compile --responses FILE`
accepts an export of the responses:

### xlsx

The spreadsheet export of Google Forms or Microsoft Forms. The first
worksheet is read, unless another one is named with `--excel-worksheet-name`. The first row holds the question titles, each following row
is one response. Extra columns (timestamps, e-mail) are ignored by the
compiler since they do not match any question title.

### csv

Same layout as the spreadsheet, as a comma separated file:

```text
Timestamp,Tottenham Hotspur — Team Rating,Referee Rating,Man of the Match
2026-02-07 18:01:02,7,5,Pedro Porro
2026-02-07 18:03:40,8,,Pedro Porro
```

Empty cells are treated as unanswered questions.

## Results

`results.json` is the compiled record. Ratings are given as a mean and a
population standard deviation. Answers that are not an integer between 0 and
10 are ignored. `motm_winners` holds every player tied with the most votes.

With `compile --reference FILE`, the freshly compiled results are compared with
a previous `results.json` and the differences are printed. The command fails
when they differ.

## Configuration

`spurs-survey` works without any configuration. A JSON file can be passed with
`--config` to change the defaults. Every key is optional:

```text
{
  "club": {"name": "Tottenham Hotspur", "label": "TOTTENHAM", "espnTeamId": "367"},
  "paths": {"dataDir": "data/matches", "imageDir": "images/players", "archiveDir": "archive"},
  "espn": {"baseUrl": "https://site.api.espn.com/apis/site/v2/sports/soccer", "league": "eng.1"},
  "forms": {"baseUrl": "https://forms.googleapis.com/v1", "tokenEnv": "GOOGLE_FORMS_ACCESS_TOKEN", "credentialsFile": "keys/forms.json"},
  "render": {"font": "fonts/Regular.ttf", "boldFont": "fonts/Bold.ttf", "placeholder": "images/placeholder.png"},
  "imageMatchThreshold": 70
}
```

The forms API is reached with a Google service account. Its JSON key file is
taken from `GOOGLE_FORMS_CREDENTIALS_FILE`, then `GOOGLE_APPLICATION_CREDENTIALS`,
then `credentialsFile`. A fresh access token is requested for every command, so
`run` works unattended. An access token already present in the environment
variable named by `tokenEnv` takes precedence over the key file. A `.env` file
in the working directory is loaded first.

Without fonts, the infographic is drawn without text. Player photos are looked
up in `imageDir` by name, with some tolerance for spelling differences (`son-heung-min.png` is
found for `Son Heung-Min`).

 */
